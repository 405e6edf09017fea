//! Seed the store with demo requests and volunteers.
//!
//! Reads a YAML fixture:
//!
//! ```yaml
//! volunteers:
//!   - name: Kim Lee
//!     email: kim@example.org
//!     location: Riverside
//!     verified: true
//! requests:
//!   - name: Ana Ruiz
//!     address: 12 Elm St
//!     details: Weekly grocery run
//! ```
//!
//! Every seeded request starts `Pending` and every volunteer `Available`.
//! Seeding appends; running it twice creates duplicates.

use std::path::Path;

use serde::Deserialize;
use tracing::info;

use carelink_admin::db::{
    self, DocumentStore, PgDocumentStore, RepositoryError, RequestRepository, VolunteerRepository,
    requests::NewRequest, volunteers::NewVolunteer,
};

use super::database_url;

/// Contents of a fixture file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Fixture {
    #[serde(default)]
    pub volunteers: Vec<NewVolunteer>,
    #[serde(default)]
    pub requests: Vec<NewRequest>,
}

impl Fixture {
    /// Names that are blank, as `collection[index]` labels.
    fn blank_names(&self) -> Vec<String> {
        let volunteers = self
            .volunteers
            .iter()
            .enumerate()
            .filter(|(_, v)| v.name.trim().is_empty())
            .map(|(i, _)| format!("volunteers[{i}]"));
        let requests = self
            .requests
            .iter()
            .enumerate()
            .filter(|(_, r)| r.name.trim().is_empty())
            .map(|(i, _)| format!("requests[{i}]"));
        volunteers.chain(requests).collect()
    }
}

/// How many documents a seeding run created.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    pub volunteers: usize,
    pub requests: usize,
}

/// Parse and validate fixture YAML.
///
/// # Errors
///
/// Returns an error if the YAML is malformed or an entry has no name.
pub fn parse_fixture(content: &str) -> Result<Fixture, Box<dyn std::error::Error>> {
    let fixture: Fixture = serde_yaml::from_str(content)?;

    let blank = fixture.blank_names();
    if !blank.is_empty() {
        return Err(format!("entries without a name: {}", blank.join(", ")).into());
    }
    Ok(fixture)
}

/// Write every fixture entry to `store`.
///
/// # Errors
///
/// Returns the first store error. Entries written before it stay written.
pub async fn seed_store(
    store: &dyn DocumentStore,
    fixture: &Fixture,
) -> Result<SeedSummary, RepositoryError> {
    let mut summary = SeedSummary::default();

    let volunteers = VolunteerRepository::new(store);
    for volunteer in &fixture.volunteers {
        volunteers.create(volunteer).await?;
        summary.volunteers += 1;
    }

    let requests = RequestRepository::new(store);
    for request in &fixture.requests {
        requests.create(request).await?;
        summary.requests += 1;
    }

    Ok(summary)
}

/// Seed the database from a YAML fixture file.
///
/// # Errors
///
/// Returns an error if environment variables are missing, the file cannot be
/// read or parsed, or a write fails.
pub async fn from_file(file_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading fixture");

    // Read and validate before connecting to the database
    let content = tokio::fs::read_to_string(path).await?;
    let fixture = parse_fixture(&content)?;

    info!(
        volunteers = fixture.volunteers.len(),
        requests = fixture.requests.len(),
        "Parsed fixture"
    );

    let pool = db::create_pool(&database_url()?).await?;
    let store = PgDocumentStore::connect(pool).await?;
    info!("Connected to database");

    let summary = seed_store(&store, &fixture).await?;

    info!("Seeding complete!");
    info!("  Volunteers created: {}", summary.volunteers);
    info!("  Requests created: {}", summary.requests);

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use carelink_admin::db::MemoryStore;
    use carelink_core::RequestStatus;

    const FIXTURE: &str = r"
volunteers:
  - name: Kim Lee
    email: kim@example.org
    location: Riverside
    verified: true
  - name: Sam Ortiz
    email: sam@example.org
requests:
  - name: Ana Ruiz
    address: 12 Elm St
    details: Weekly grocery run
";

    #[test]
    fn test_parse_fixture() {
        let fixture = parse_fixture(FIXTURE).unwrap();
        assert_eq!(fixture.volunteers.len(), 2);
        assert!(fixture.volunteers.first().unwrap().verified);
        assert!(!fixture.volunteers.last().unwrap().verified);
        assert_eq!(fixture.requests.len(), 1);
    }

    #[test]
    fn test_blank_names_are_rejected() {
        let err = parse_fixture("requests:\n  - name: ' '\n").unwrap_err();
        assert!(err.to_string().contains("requests[0]"));
    }

    #[test]
    fn test_unknown_sections_are_rejected() {
        assert!(parse_fixture("shifts: []\n").is_err());
    }

    #[tokio::test]
    async fn test_seed_store_writes_everything() {
        let store = MemoryStore::new();
        let fixture = parse_fixture(FIXTURE).unwrap();

        let summary = seed_store(&store, &fixture).await.unwrap();
        assert_eq!(
            summary,
            SeedSummary {
                volunteers: 2,
                requests: 1
            }
        );

        let requests = RequestRepository::new(&store).list().await.unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests.first().unwrap().status, RequestStatus::Pending);
    }

    #[test]
    fn test_demo_fixture_parses() {
        let content = include_str!("../../fixtures/demo.yaml");
        let fixture = parse_fixture(content).unwrap();
        assert!(!fixture.volunteers.is_empty());
        assert!(!fixture.requests.is_empty());
    }
}
