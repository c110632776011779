//! Known hosting services.

use crate::profiles::ProfileStore;

pub const DEFAULT_SERVICES: [&str; 4] = ["GitHub", "GitLab", "Bitbucket", "Self-hosted"];

/// Default services followed by any other services used by stored profiles,
/// each once, in first-seen order
pub fn list_services(store: &ProfileStore) -> Vec<String> {
    let mut services: Vec<String> = DEFAULT_SERVICES.iter().map(|s| s.to_string()).collect();

    for service in store.get_profiles().iter().filter_map(|p| p.service.as_deref()) {
        let service = service.trim();
        if service.is_empty() || services.iter().any(|s| s == service) {
            continue;
        }
        services.push(service.to_string());
    }
    services
}

/// Web page for adding SSH keys on a known service (case-insensitive)
pub fn ssh_settings_url(service: &str) -> Option<&'static str> {
    match service.to_lowercase().as_str() {
        "github" => Some("https://github.com/settings/keys"),
        "gitlab" => Some("https://gitlab.com/-/profile/keys"),
        "bitbucket" => Some("https://bitbucket.org/account/settings/ssh-keys/"),
        _ => None,
    }
}

pub fn is_github(service: &str) -> bool {
    service.eq_ignore_ascii_case("github")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profiles::Profile;
    use std::path::Path;

    fn store_with(services: &[Option<&str>]) -> ProfileStore {
        let mut store = ProfileStore::open_at(Path::new("/nonexistent/config.json")).unwrap();
        for (i, service) in services.iter().enumerate() {
            let mut p = Profile::new(format!("p{}", i), "/k");
            p.service = service.map(str::to_string);
            store.add_profile(p).unwrap();
        }
        store
    }

    #[test]
    fn test_defaults_only() {
        let store = store_with(&[]);
        assert_eq!(list_services(&store), DEFAULT_SERVICES.to_vec());
    }

    #[test]
    fn test_profile_services_appended_once() {
        let store = store_with(&[
            Some("Codeberg"),
            None,
            Some("Gitea"),
            Some("Codeberg"),
            Some(""),
            Some("GitHub"),
        ]);

        assert_eq!(
            list_services(&store),
            vec!["GitHub", "GitLab", "Bitbucket", "Self-hosted", "Codeberg", "Gitea"]
        );
    }

    #[test]
    fn test_ssh_settings_url() {
        assert_eq!(
            ssh_settings_url("GITHUB"),
            Some("https://github.com/settings/keys")
        );
        assert_eq!(
            ssh_settings_url("gitlab"),
            Some("https://gitlab.com/-/profile/keys")
        );
        assert!(ssh_settings_url("Bitbucket").is_some());
        assert_eq!(ssh_settings_url("Self-hosted"), None);
        assert_eq!(ssh_settings_url("Codeberg"), None);
    }
}
