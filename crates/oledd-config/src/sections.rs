//! Configuration sections

use serde::{Deserialize, Serialize};

/// MQTT broker connection and topics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MqttConfig {
    #[serde(default = "default_broker")]
    pub broker: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_user")]
    pub user: String,

    /// Credentials are only sent when both user and password are set
    #[serde(default)]
    pub password: String,

    #[serde(default = "default_client_id")]
    pub client_id: String,

    /// Keep-alive interval in seconds
    #[serde(default = "default_keep_alive")]
    pub keep_alive_secs: u64,

    /// Fixed delay before reconnecting or restarting the ingress task
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_secs: u64,

    #[serde(default)]
    pub topics: TopicConfig,
}

fn default_broker() -> String {
    "core-mqtt".to_string()
}

fn default_port() -> u16 {
    1883
}

fn default_user() -> String {
    "homeassistant".to_string()
}

fn default_client_id() -> String {
    "oledd".to_string()
}

fn default_keep_alive() -> u64 {
    60
}

fn default_reconnect_delay() -> u64 {
    5
}

impl MqttConfig {
    /// Whether credentials should be sent on connect
    pub fn has_credentials(&self) -> bool {
        !self.user.is_empty() && !self.password.is_empty()
    }
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            broker: default_broker(),
            port: default_port(),
            user: default_user(),
            password: String::new(),
            client_id: default_client_id(),
            keep_alive_secs: default_keep_alive(),
            reconnect_delay_secs: default_reconnect_delay(),
            topics: TopicConfig::default(),
        }
    }
}

/// MQTT topic names
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicConfig {
    #[serde(default = "default_text_topic")]
    pub text: String,

    #[serde(default = "default_command_topic")]
    pub command: String,

    #[serde(default = "default_mode_topic")]
    pub mode: String,

    #[serde(default = "default_brightness_topic")]
    pub brightness: String,

    #[serde(default = "default_refresh_topic")]
    pub refresh: String,

    /// Prefix for custom data topics, the remainder of the topic is the key
    #[serde(default = "default_data_prefix")]
    pub data_prefix: String,

    #[serde(default = "default_status_topic")]
    pub status: String,

    #[serde(default = "default_availability_topic")]
    pub availability: String,
}

const TOPIC_ROOT: &str = "screen/gme12864";

fn default_text_topic() -> String {
    format!("{}/text", TOPIC_ROOT)
}

fn default_command_topic() -> String {
    format!("{}/command", TOPIC_ROOT)
}

fn default_mode_topic() -> String {
    format!("{}/mode", TOPIC_ROOT)
}

fn default_brightness_topic() -> String {
    format!("{}/brightness", TOPIC_ROOT)
}

fn default_refresh_topic() -> String {
    format!("{}/refresh", TOPIC_ROOT)
}

fn default_data_prefix() -> String {
    format!("{}/data/", TOPIC_ROOT)
}

fn default_status_topic() -> String {
    format!("{}/status", TOPIC_ROOT)
}

fn default_availability_topic() -> String {
    format!("{}/availability", TOPIC_ROOT)
}

impl TopicConfig {
    /// Topic filters to subscribe to
    pub fn subscriptions(&self) -> Vec<String> {
        vec![
            self.text.clone(),
            self.command.clone(),
            self.mode.clone(),
            self.brightness.clone(),
            self.refresh.clone(),
            format!("{}#", self.data_prefix),
        ]
    }
}

impl Default for TopicConfig {
    fn default() -> Self {
        Self {
            text: default_text_topic(),
            command: default_command_topic(),
            mode: default_mode_topic(),
            brightness: default_brightness_topic(),
            refresh: default_refresh_topic(),
            data_prefix: default_data_prefix(),
            status: default_status_topic(),
            availability: default_availability_topic(),
        }
    }
}

/// Panel wiring and geometry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// I2C bus number (`/dev/i2c-N`)
    #[serde(default = "default_i2c_port")]
    pub i2c_port: u8,

    /// 7-bit I2C address
    #[serde(default = "default_i2c_address")]
    pub i2c_address: u8,

    #[serde(default = "default_width")]
    pub width: u32,

    #[serde(default = "default_height")]
    pub height: u32,

    /// Controller type
    #[serde(default = "default_display_type")]
    pub display_type: String,

    /// Initial brightness (0-255)
    #[serde(default = "default_brightness")]
    pub brightness: u8,
}

fn default_i2c_port() -> u8 {
    1
}

fn default_i2c_address() -> u8 {
    0x3C
}

fn default_width() -> u32 {
    128
}

fn default_height() -> u32 {
    64
}

fn default_display_type() -> String {
    "ssd1306".to_string()
}

fn default_brightness() -> u8 {
    255
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            i2c_port: default_i2c_port(),
            i2c_address: default_i2c_address(),
            width: default_width(),
            height: default_height(),
            display_type: default_display_type(),
            brightness: default_brightness(),
        }
    }
}

/// Mode scheduling and animation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Mode at startup
    #[serde(default = "default_mode")]
    pub initial_mode: String,

    /// Screens cycled in auto mode, in order
    #[serde(default = "default_rotation")]
    pub rotation: Vec<String>,

    /// Seconds each screen stays up in auto mode
    #[serde(default = "default_rotation_interval")]
    pub rotation_interval_secs: u64,

    /// Render loop period in milliseconds
    #[serde(default = "default_tick")]
    pub tick_ms: u64,

    /// Ticks to hold at each end of a bounce scroll
    #[serde(default = "default_scroll_pause")]
    pub scroll_pause_ticks: u32,

    /// Horizontal marquee speed in pixels per second
    #[serde(default = "default_marquee_speed")]
    pub marquee_px_per_sec: u32,

    /// Switch to manual mode when a text message arrives
    #[serde(default = "default_true")]
    pub text_switches_mode: bool,
}

fn default_mode() -> String {
    "auto".to_string()
}

fn default_rotation() -> Vec<String> {
    vec!["system".into(), "network".into(), "qr".into()]
}

fn default_rotation_interval() -> u64 {
    5
}

fn default_tick() -> u64 {
    60
}

fn default_scroll_pause() -> u32 {
    25
}

fn default_marquee_speed() -> u32 {
    24
}

fn default_true() -> bool {
    true
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            initial_mode: default_mode(),
            rotation: default_rotation(),
            rotation_interval_secs: default_rotation_interval(),
            tick_ms: default_tick(),
            scroll_pause_ticks: default_scroll_pause(),
            marquee_px_per_sec: default_marquee_speed(),
            text_switches_mode: true,
        }
    }
}

/// Host telemetry collection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Seconds a system snapshot is reused
    #[serde(default = "default_system_cache")]
    pub system_cache_secs: u64,

    /// Seconds a network snapshot is reused
    #[serde(default = "default_network_cache")]
    pub network_cache_secs: u64,

    /// Host probed for reachability
    #[serde(default = "default_ping_host")]
    pub ping_host: String,

    /// Hard limit on the reachability probe
    #[serde(default = "default_ping_timeout")]
    pub ping_timeout_ms: u64,

    /// Interfaces listed on the network screen
    #[serde(default = "default_max_interfaces")]
    pub max_interfaces: usize,

    /// Filesystem reported as disk usage
    #[serde(default = "default_disk_path")]
    pub disk_path: String,

    /// Thermal zone read for CPU temperature
    #[serde(default = "default_thermal_zone")]
    pub thermal_zone: String,
}

fn default_system_cache() -> u64 {
    2
}

fn default_network_cache() -> u64 {
    3
}

fn default_ping_host() -> String {
    "8.8.8.8".to_string()
}

fn default_ping_timeout() -> u64 {
    1500
}

fn default_max_interfaces() -> usize {
    4
}

fn default_disk_path() -> String {
    "/".to_string()
}

fn default_thermal_zone() -> String {
    "/sys/class/thermal/thermal_zone0/temp".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            system_cache_secs: default_system_cache(),
            network_cache_secs: default_network_cache(),
            ping_host: default_ping_host(),
            ping_timeout_ms: default_ping_timeout(),
            max_interfaces: default_max_interfaces(),
            disk_path: default_disk_path(),
            thermal_zone: default_thermal_zone(),
        }
    }
}

/// QR code screen
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QrConfig {
    /// Payload encoded in the symbol
    #[serde(default = "default_qr_link")]
    pub link: String,
}

fn default_qr_link() -> String {
    "http://homeassistant.local:8123/".to_string()
}

impl Default for QrConfig {
    fn default() -> Self {
        Self {
            link: default_qr_link(),
        }
    }
}
