//! Configuration loading from TOML files
//!
//! Config file is selected via:
//! 1. --config <path> command line argument
//! 2. CONFIG_FILE environment variable
//! 3. Default: config/dev.toml

use crate::domain::types::{Person, Place};
use anyhow::Context;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct RobotConfig {
    /// Robot identifier, used for MQTT client ids and status payloads
    #[serde(default = "default_robot_id")]
    pub id: String,
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self { id: default_robot_id() }
    }
}

fn default_robot_id() -> String {
    "robot".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct FollowConfig {
    /// Seconds without the target before the gateway reports it lost
    #[serde(default = "default_lost_timeout_secs")]
    pub lost_timeout_secs: u64,
    /// Maximum follow distance in meters
    #[serde(default = "default_max_distance_m")]
    pub max_distance_m: f32,
    /// Fixed delay between tracking loop iterations
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for FollowConfig {
    fn default() -> Self {
        Self {
            lost_timeout_secs: default_lost_timeout_secs(),
            max_distance_m: default_max_distance_m(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

fn default_lost_timeout_secs() -> u64 {
    10
}

fn default_max_distance_m() -> f32 {
    2.5
}

fn default_poll_interval_ms() -> u64 {
    500
}

#[derive(Debug, Clone, Deserialize)]
pub struct NavigationConfig {
    #[serde(default = "default_coordinate_deviation")]
    pub coordinate_deviation: f64,
    #[serde(default = "default_navigation_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            coordinate_deviation: default_coordinate_deviation(),
            timeout_ms: default_navigation_timeout_ms(),
        }
    }
}

fn default_coordinate_deviation() -> f64 {
    0.12345
}

fn default_navigation_timeout_ms() -> u64 {
    100_000
}

#[derive(Debug, Clone, Deserialize)]
pub struct MotionConfig {
    #[serde(default = "default_linear_speed")]
    pub linear_speed: f32,
    #[serde(default = "default_forward_distance_m")]
    pub forward_distance_m: f32,
    #[serde(default = "default_turn_left_speed")]
    pub turn_left_speed: f32,
    #[serde(default = "default_turn_right_speed")]
    pub turn_right_speed: f32,
    /// Horizontal head angle used by head up/down moves
    #[serde(default = "default_head_horizontal")]
    pub head_horizontal: i32,
    #[serde(default = "default_head_up_vertical")]
    pub head_up_vertical: i32,
    #[serde(default = "default_head_down_vertical")]
    pub head_down_vertical: i32,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            linear_speed: default_linear_speed(),
            forward_distance_m: default_forward_distance_m(),
            turn_left_speed: default_turn_left_speed(),
            turn_right_speed: default_turn_right_speed(),
            head_horizontal: default_head_horizontal(),
            head_up_vertical: default_head_up_vertical(),
            head_down_vertical: default_head_down_vertical(),
        }
    }
}

fn default_linear_speed() -> f32 {
    0.3
}

fn default_forward_distance_m() -> f32 {
    1.0
}

fn default_turn_left_speed() -> f32 {
    0.3
}

fn default_turn_right_speed() -> f32 {
    1.5
}

fn default_head_horizontal() -> i32 {
    50
}

fn default_head_up_vertical() -> i32 {
    80
}

fn default_head_down_vertical() -> i32 {
    10
}

#[derive(Debug, Clone, Deserialize)]
pub struct MqttConfig {
    #[serde(default = "default_mqtt_enabled")]
    pub enabled: bool,
    #[serde(default = "default_mqtt_host")]
    pub host: String,
    #[serde(default = "default_mqtt_port")]
    pub port: u16,
    /// Topic carrying remote commands (subscribed)
    #[serde(default = "default_command_topic")]
    pub command_topic: String,
    /// Topic for robot state snapshots (published, QoS 0)
    #[serde(default = "default_status_topic")]
    pub status_topic: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            enabled: default_mqtt_enabled(),
            host: default_mqtt_host(),
            port: default_mqtt_port(),
            command_topic: default_command_topic(),
            status_topic: default_status_topic(),
            username: None,
            password: None,
        }
    }
}

fn default_mqtt_enabled() -> bool {
    true
}

fn default_mqtt_host() -> String {
    "localhost".to_string()
}

fn default_mqtt_port() -> u16 {
    1883
}

fn default_command_topic() -> String {
    "robot/commands".to_string()
}

fn default_status_topic() -> String {
    "robot/status".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_interval")]
    pub interval_secs: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { interval_secs: default_metrics_interval() }
    }
}

fn default_metrics_interval() -> u64 {
    10
}

/// Scripted world for the simulated gateway
#[derive(Debug, Clone, Deserialize)]
pub struct SimConfig {
    #[serde(default)]
    pub persons: Vec<Person>,
    #[serde(default)]
    pub places: Vec<Place>,
    /// Delay before the simulated gateway answers a follow command
    #[serde(default = "default_sim_follow_delay_ms")]
    pub follow_delay_ms: u64,
    /// Simulated speech duration per character
    #[serde(default = "default_sim_speech_ms_per_char")]
    pub speech_ms_per_char: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            persons: Vec::new(),
            places: Vec::new(),
            follow_delay_ms: default_sim_follow_delay_ms(),
            speech_ms_per_char: default_sim_speech_ms_per_char(),
        }
    }
}

fn default_sim_follow_delay_ms() -> u64 {
    200
}

fn default_sim_speech_ms_per_char() -> u64 {
    40
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub robot: RobotConfig,
    #[serde(default)]
    pub follow: FollowConfig,
    #[serde(default)]
    pub navigation: NavigationConfig,
    #[serde(default)]
    pub motion: MotionConfig,
    #[serde(default)]
    pub mqtt: MqttConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub sim: SimConfig,
}

/// Main configuration struct used throughout the application
#[derive(Debug, Clone)]
pub struct Config {
    robot_id: String,
    follow_lost_timeout_secs: u64,
    follow_max_distance_m: f32,
    follow_poll_interval_ms: u64,
    navigation_coordinate_deviation: f64,
    navigation_timeout_ms: u64,
    motion: MotionConfig,
    mqtt_enabled: bool,
    mqtt_host: String,
    mqtt_port: u16,
    mqtt_command_topic: String,
    mqtt_status_topic: String,
    mqtt_username: Option<String>,
    mqtt_password: Option<String>,
    metrics_interval_secs: u64,
    sim: SimConfig,
    config_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_toml(TomlConfig::default(), "default".to_string())
    }
}

impl Config {
    fn from_toml(toml_config: TomlConfig, config_file: String) -> Self {
        Self {
            robot_id: toml_config.robot.id,
            follow_lost_timeout_secs: toml_config.follow.lost_timeout_secs,
            follow_max_distance_m: toml_config.follow.max_distance_m,
            follow_poll_interval_ms: toml_config.follow.poll_interval_ms,
            navigation_coordinate_deviation: toml_config.navigation.coordinate_deviation,
            navigation_timeout_ms: toml_config.navigation.timeout_ms,
            motion: toml_config.motion,
            mqtt_enabled: toml_config.mqtt.enabled,
            mqtt_host: toml_config.mqtt.host,
            mqtt_port: toml_config.mqtt.port,
            mqtt_command_topic: toml_config.mqtt.command_topic,
            mqtt_status_topic: toml_config.mqtt.status_topic,
            mqtt_username: toml_config.mqtt.username,
            mqtt_password: toml_config.mqtt.password,
            metrics_interval_secs: toml_config.metrics.interval_secs,
            sim: toml_config.sim,
            config_file,
        }
    }

    /// Config path used when none is given on the command line
    pub fn default_config_path() -> String {
        env::var("CONFIG_FILE").unwrap_or_else(|_| "config/dev.toml".to_string())
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let toml_config: TomlConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        Ok(Self::from_toml(toml_config, path.display().to_string()))
    }

    /// Load configuration - tries TOML file first, falls back to defaults
    pub fn load_from_path(path: &str) -> Self {
        match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Warning: {:#}. Using defaults.", e);
                Self::default()
            }
        }
    }

    pub fn robot_id(&self) -> &str {
        &self.robot_id
    }

    pub fn follow_lost_timeout_secs(&self) -> u64 {
        self.follow_lost_timeout_secs
    }

    pub fn follow_max_distance_m(&self) -> f32 {
        self.follow_max_distance_m
    }

    pub fn follow_poll_interval(&self) -> Duration {
        Duration::from_millis(self.follow_poll_interval_ms)
    }

    pub fn navigation_coordinate_deviation(&self) -> f64 {
        self.navigation_coordinate_deviation
    }

    pub fn navigation_timeout_ms(&self) -> u64 {
        self.navigation_timeout_ms
    }

    pub fn motion(&self) -> &MotionConfig {
        &self.motion
    }

    pub fn mqtt_enabled(&self) -> bool {
        self.mqtt_enabled
    }

    pub fn mqtt_host(&self) -> &str {
        &self.mqtt_host
    }

    pub fn mqtt_port(&self) -> u16 {
        self.mqtt_port
    }

    pub fn mqtt_command_topic(&self) -> &str {
        &self.mqtt_command_topic
    }

    pub fn mqtt_status_topic(&self) -> &str {
        &self.mqtt_status_topic
    }

    pub fn mqtt_username(&self) -> Option<&str> {
        self.mqtt_username.as_deref()
    }

    pub fn mqtt_password(&self) -> Option<&str> {
        self.mqtt_password.as_deref()
    }

    pub fn metrics_interval_secs(&self) -> u64 {
        self.metrics_interval_secs
    }

    pub fn sim(&self) -> &SimConfig {
        &self.sim
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }

    /// Builder method for tests to shorten the tracking loop delay
    pub fn with_poll_interval_ms(mut self, ms: u64) -> Self {
        self.follow_poll_interval_ms = ms;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.robot_id(), "robot");
        assert_eq!(config.follow_lost_timeout_secs(), 10);
        assert_eq!(config.follow_max_distance_m(), 2.5);
        assert_eq!(config.follow_poll_interval(), Duration::from_millis(500));
        assert_eq!(config.navigation_timeout_ms(), 100_000);
        assert_eq!(config.mqtt_command_topic(), "robot/commands");
        assert_eq!(config.config_file(), "default");
    }

    #[test]
    fn test_motion_defaults() {
        let motion = MotionConfig::default();
        assert_eq!(motion.turn_right_speed, 1.5);
        assert_eq!(motion.head_up_vertical, 80);
        assert_eq!(motion.head_down_vertical, 10);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let toml_config: TomlConfig = toml::from_str(
            r#"
[follow]
poll_interval_ms = 250
"#,
        )
        .unwrap();
        let config = Config::from_toml(toml_config, "inline".to_string());
        assert_eq!(config.follow_poll_interval(), Duration::from_millis(250));
        assert_eq!(config.follow_lost_timeout_secs(), 10);
        assert!(config.mqtt_enabled());
    }

    #[test]
    fn test_with_poll_interval() {
        let config = Config::default().with_poll_interval_ms(5);
        assert_eq!(config.follow_poll_interval(), Duration::from_millis(5));
    }
}
