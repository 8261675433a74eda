use crate::geocode::NominatimGateway;
use crate::geolocate::IpApiSource;

pub struct AppState {
    pub gateway: NominatimGateway,
    pub positioner: IpApiSource,
    pub map_key: Option<String>,
}
