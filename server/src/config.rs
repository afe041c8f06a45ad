use crate::session::RoomConfig;

/// Everything the server needs to start.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the TCP listener binds to.
    pub address: String,
    /// Settings applied to every room created by this server.
    pub room: RoomConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:3001".to_string(),
            room: RoomConfig::default(),
        }
    }
}
