use routescore::ownership_checker::unique_ownership_pairs;
use routescore::shared::{RouteStatus, ScorePolicy};
use routescore::{
    ASBlockRegistry, LegitimacyScorer, OwnershipChecker, OwnershipVerdict, Route,
};

fn route(origin_ip: &str, start: &str) -> Route {
    Route::new(
        "1735689600".to_string(),
        RouteStatus::Announce,
        origin_ip.to_string(),
        start.to_string(),
        "203.0.113.0/24".to_string(),
        vec![start.to_string(), "64999".to_string()],
    )
}

fn blocks() -> ASBlockRegistry {
    ASBlockRegistry::from_reader("203.0.113.0/24,64500,ExampleNet\n".as_bytes()).unwrap()
}

#[test]
fn test_matched_route_is_not_rewarded() {
    let blocks = blocks();
    let mut routes = vec![route("203.0.113.5", "64500")];

    let report = OwnershipChecker::new(&blocks).check_routes(&routes);
    assert!(report.no_match_records().is_empty());
    assert_eq!(report.verdict_for(&routes[0]), Some(OwnershipVerdict::Matched));

    let scored = LegitimacyScorer::default().score(&mut routes, &report);
    assert_eq!(scored, 0);
    assert_eq!(routes[0].legitimacy_score, 0);
}

#[test]
fn test_unmatched_route_is_rewarded() {
    let blocks = blocks();
    let mut routes = vec![route("198.51.100.5", "64500")];

    let report = OwnershipChecker::new(&blocks).check_routes(&routes);
    assert_eq!(
        report.no_match_records(),
        &[("198.51.100.5".to_string(), "64500".to_string())]
    );

    let scored = LegitimacyScorer::default().score(&mut routes, &report);
    assert_eq!(scored, 1);
    assert_eq!(routes[0].legitimacy_score, 5);
}

#[test]
fn test_unregistered_as_is_untouched() {
    let blocks = blocks();
    let mut routes = vec![route("198.51.100.5", "65000"), route("203.0.113.5", "65000")];

    let report = OwnershipChecker::new(&blocks).check_routes(&routes);
    assert!(report.no_match_records().is_empty());
    assert_eq!(report.counts().unregistered, 2);

    for policy in [ScorePolicy::RewardUnmatched, ScorePolicy::RewardMatched] {
        LegitimacyScorer::new(5, policy).score(&mut routes, &report);
    }
    assert!(routes.iter().all(|r| r.legitimacy_score == 0));
}

#[test]
fn test_reward_matched_policy_flips_selection() {
    let blocks = blocks();
    let mut routes = vec![route("203.0.113.5", "64500"), route("198.51.100.5", "64500")];

    let report = OwnershipChecker::new(&blocks).check_routes(&routes);
    LegitimacyScorer::new(3, ScorePolicy::RewardMatched).score(&mut routes, &report);

    assert_eq!(routes[0].legitimacy_score, 3);
    assert_eq!(routes[1].legitimacy_score, 0);
}

#[test]
fn test_every_route_sharing_a_pair_is_scored() {
    let blocks = blocks();
    let mut first = route("198.51.100.5", "64500");
    first.as_path.push("64998".to_string());
    let mut routes = vec![first, route("198.51.100.5", "64500")];

    assert_eq!(unique_ownership_pairs(&routes).len(), 1);
    let report = OwnershipChecker::new(&blocks).check_routes(&routes);
    let scored = LegitimacyScorer::default().score(&mut routes, &report);

    assert_eq!(scored, 2);
    assert!(routes.iter().all(|r| r.legitimacy_score == 5));
}

#[test]
fn test_scores_only_increase() {
    let blocks = blocks();
    let mut routes = vec![route("198.51.100.5", "64500"), route("203.0.113.5", "64500")];
    routes[1].legitimacy_score = 10;

    let report = OwnershipChecker::new(&blocks).check_routes(&routes);
    let before: Vec<u32> = routes.iter().map(|r| r.legitimacy_score).collect();
    LegitimacyScorer::default().score(&mut routes, &report);

    for (route, old) in routes.iter().zip(before) {
        assert!(route.legitimacy_score >= old);
    }
}

#[test]
fn test_malformed_origin_ip_is_not_rewarded() {
    let blocks = blocks();
    let mut routes = vec![route("not-an-ip", "64500")];

    let report = OwnershipChecker::new(&blocks).check_routes(&routes);
    assert_eq!(report.counts().malformed, 1);
    assert!(report.no_match_records().is_empty());

    LegitimacyScorer::default().score(&mut routes, &report);
    assert_eq!(routes[0].legitimacy_score, 0);
}
