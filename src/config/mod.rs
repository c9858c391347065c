use rocket::figment::{Figment, providers::{Env, Format, Toml}};
use rocket::Config as RocketConfig;
use std::env;

pub struct Config;

impl Config {
    fn figment() -> Figment {
        // Get the current profile
        let profile = env::var("ROCKET_PROFILE").unwrap_or_else(|_| "development".to_string());

        Figment::from(RocketConfig::default())
            .merge(Toml::file("Rocket.toml").nested())
            .select(&profile)
            .merge(Env::prefixed("ROCKET_").split("_"))
    }

    pub fn jwt_secret() -> String {
        Self::figment()
            .extract_inner("jwt_secret")
            .unwrap_or_else(|_| "default-secret".to_string())
    }

    pub fn jwt_refresh_secret() -> String {
        Self::figment()
            .extract_inner("jwt_refresh_secret")
            .unwrap_or_else(|_| "default-refresh-secret".to_string())
    }

    pub fn jwt_expiry() -> i64 {
        Self::figment()
            .extract_inner("jwt_expiry")
            .unwrap_or(900)
    }

    pub fn jwt_refresh_expiry() -> i64 {
        Self::figment()
            .extract_inner("jwt_refresh_expiry")
            .unwrap_or(604800)
    }

    pub fn mongodb_uri() -> String {
        Self::figment()
            .extract_inner("mongodb_uri")
            .unwrap_or_else(|_| "mongodb://localhost:27017/talentgate".to_string())
    }

    /// Fraction of the settled amount credited to the coupon's creator.
    pub fn commission_rate() -> f64 {
        Self::figment()
            .extract_inner("commission_rate")
            .unwrap_or(0.10)
    }

    pub fn currency() -> String {
        Self::figment()
            .extract_inner("currency")
            .unwrap_or_else(|_| "INR".to_string())
    }

    pub fn bootstrap_admin_email() -> Option<String> {
        Self::figment()
            .extract_inner("bootstrap_admin_email")
            .ok()
    }

    pub fn bootstrap_admin_password() -> Option<String> {
        Self::figment()
            .extract_inner("bootstrap_admin_password")
            .ok()
    }

    pub fn is_development() -> bool {
        let profile = env::var("ROCKET_PROFILE").unwrap_or_else(|_| "development".to_string());
        profile == "development"
    }
}
