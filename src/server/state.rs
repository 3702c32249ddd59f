use crate::settings;

#[derive(Clone)]
pub struct ServerState {
    pub settings: settings::Settings,
}
