pub const DISCOVERY_PREFIX: &str = "homeassistant";

pub fn temperature_state(hostname: &str) -> String {
    format!("{DISCOVERY_PREFIX}/sensor/{hostname}/temperature/state")
}

pub fn humidity_state(hostname: &str) -> String {
    format!("{DISCOVERY_PREFIX}/sensor/{hostname}/humidity/state")
}

pub fn temperature_config(hostname: &str) -> String {
    format!("{DISCOVERY_PREFIX}/sensor/{hostname}/temperature/config")
}

pub fn humidity_config(hostname: &str) -> String {
    format!("{DISCOVERY_PREFIX}/sensor/{hostname}/humidity/config")
}

pub fn command(hostname: &str) -> String {
    format!("{DISCOVERY_PREFIX}/{hostname}/command")
}
