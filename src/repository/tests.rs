//! Repository Integration Tests
//!
//! Tests for LocalStore with in-memory SQLite database.

#[cfg(test)]
mod tests {
    use crate::domain::{ServerId, SurveyError, WaypointPayload};
    use crate::repository::{open_db, LocalStore, RemoteStore};
    use std::path::PathBuf;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    fn setup_test_db() -> LocalStore {
        // Use in-memory database for tests
        let db_path = PathBuf::from(":memory:");
        let conn = open_db(&db_path).expect("Failed to init test DB");
        LocalStore::new(Arc::new(Mutex::new(conn)))
    }

    fn payload(name: &str, latitude: f64, longitude: f64) -> WaypointPayload {
        WaypointPayload {
            name: name.to_string(),
            latitude,
            longitude,
            notes: String::new(),
            image_url: None,
        }
    }

    #[tokio::test]
    async fn test_create_waypoint() {
        let repo = setup_test_db();

        let created = repo.create(&payload("Camp", 12.34, 56.78)).await.expect("Failed to create");

        assert_eq!(created.name, "Camp");
        assert_eq!(created.latitude, 12.34);
        assert_eq!(created.longitude, 56.78);
        assert!(created.created_at.is_some());
        assert_eq!(created.created_at, created.updated_at);
        // Empty notes are stored as NULL
        assert_eq!(created.notes, None);
    }

    #[tokio::test]
    async fn test_create_rejects_blank_name() {
        let repo = setup_test_db();
        let err = repo.create(&payload("  ", 0.0, 0.0)).await.unwrap_err();
        assert!(matches!(err, SurveyError::ValidationRejected(_)));
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let repo = setup_test_db();

        let first = repo.create(&payload("First", 1.0, 1.0)).await.unwrap();
        let second = repo.create(&payload("Second", 2.0, 2.0)).await.unwrap();

        let listed = repo.list().await.expect("List failed");
        let ids: Vec<ServerId> = listed.into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[tokio::test]
    async fn test_update_waypoint() {
        let repo = setup_test_db();
        let created = repo.create(&payload("Original", 1.0, 1.0)).await.unwrap();

        let mut changed = payload("Updated", 3.0, 4.0);
        changed.notes = "muddy".to_string();
        changed.image_url = Some("https://img.test/a.jpg".to_string());

        let updated = repo.update(&created.id, &changed).await.expect("Update failed");
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.name, "Updated");
        assert_eq!(updated.notes.as_deref(), Some("muddy"));
        assert_eq!(updated.image_url.as_deref(), Some("https://img.test/a.jpg"));
        assert_eq!(updated.created_at, created.created_at);
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let repo = setup_test_db();
        let err = repo.update(&ServerId::from(42), &payload("X", 0.0, 0.0)).await.unwrap_err();
        assert_eq!(err, SurveyError::ValidationRejected("Waypoint not found".to_string()));

        let err = repo.update(&ServerId::new("abc"), &payload("X", 0.0, 0.0)).await.unwrap_err();
        assert_eq!(err, SurveyError::ValidationRejected("Waypoint not found".to_string()));
    }

    #[tokio::test]
    async fn test_delete_waypoint() {
        let repo = setup_test_db();
        let created = repo.create(&payload("To delete", 1.0, 1.0)).await.unwrap();

        let response = repo.delete(&created.id).await.expect("Delete failed");
        assert_eq!(response.message, "Waypoint deleted successfully");
        assert_eq!(response.waypoint.map(|w| w.id), Some(created.id.clone()));

        assert!(repo.list().await.unwrap().is_empty());
        assert!(repo.delete(&created.id).await.is_err());
    }

    #[tokio::test]
    async fn test_default_location_lookup() {
        let repo = setup_test_db();
        let err = repo.default_location().await.unwrap_err();
        assert!(matches!(err, SurveyError::ValidationRejected(_)));

        repo.create(&payload("Camp", 1.0, 1.0)).await.unwrap();
        let home = repo.create(&payload(" default LOCATION", 5.0, 6.0)).await.unwrap();

        let found = repo.default_location().await.expect("Default lookup failed");
        assert_eq!(found.id, home.id);
    }
}
