use ipnetwork::IpNetwork;
use serde::{Deserialize, Serialize};

use crate::shared::RouteStatus;

/// AS numbers are kept in the textual form the update dump uses, so AS-sets
/// such as `{64500,64501}` survive ingestion untouched.
pub type ASN = String;

/// One announced path taken from an update dump.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub timestamp: String,
    pub status: RouteStatus,
    pub origin_ip: String,
    pub start_system: ASN,
    pub target_system: Option<ASN>,
    pub prefix: String,
    pub as_path: Vec<ASN>,
    pub legitimacy_score: u32,
    pub additional_info: Option<String>,
}

impl Route {
    pub fn new(
        timestamp: String,
        status: RouteStatus,
        origin_ip: String,
        start_system: ASN,
        prefix: String,
        as_path: Vec<ASN>,
    ) -> Self {
        let target_system = as_path.last().cloned();
        Route {
            timestamp,
            status,
            origin_ip,
            start_system,
            target_system,
            prefix,
            as_path,
            legitimacy_score: 0,
            additional_info: None,
        }
    }

    pub fn with_additional_info(mut self, info: String) -> Self {
        self.additional_info = Some(info);
        self
    }

    /// Key used by the ownership checker and the scorer.
    pub fn ownership_key(&self) -> (String, ASN) {
        (self.origin_ip.clone(), self.start_system.clone())
    }

    pub fn prefix_network(&self) -> Option<IpNetwork> {
        self.prefix.parse().ok()
    }

    /// Adds to the score. Saturates instead of wrapping.
    pub fn reward(&mut self, amount: u32) {
        self.legitimacy_score = self.legitimacy_score.saturating_add(amount);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_system_is_last_path_element() {
        let route = Route::new(
            "1735689600".to_string(),
            RouteStatus::Announce,
            "203.0.113.5".to_string(),
            "64500".to_string(),
            "198.51.100.0/24".to_string(),
            vec!["64500".to_string(), "64501".to_string(), "64502".to_string()],
        );

        assert_eq!(route.target_system.as_deref(), Some("64502"));
        assert_eq!(route.legitimacy_score, 0);
    }

    #[test]
    fn test_empty_path_has_no_target() {
        let route = Route::new(
            String::new(),
            RouteStatus::Announce,
            String::new(),
            String::new(),
            String::new(),
            Vec::new(),
        );

        assert!(route.target_system.is_none());
        assert!(route.prefix_network().is_none());
    }

    #[test]
    fn test_reward_saturates() {
        let mut route = Route::new(
            String::new(),
            RouteStatus::Announce,
            String::new(),
            String::new(),
            String::new(),
            Vec::new(),
        );
        route.legitimacy_score = u32::MAX - 1;
        route.reward(5);
        assert_eq!(route.legitimacy_score, u32::MAX);
    }
}
