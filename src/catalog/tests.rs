//! Catalog Module Tests
//!
//! ## Test Scopes
//! - **Tokenizer**: Keywords derived from file names.
//! - **Scoring**: Highest keyword count wins, ties keep the first entry.
//! - **Loading**: Manifest order, directory scan order, unsafe names.
//! - **Handlers**: Match and not-found responses, model download.

#[cfg(test)]
mod tests {
    use crate::catalog::engine::{Catalog, MANIFEST_FILE, score};
    use crate::catalog::handlers::{handle_available_models, handle_generate_model};
    use crate::catalog::tokenizer::{keywords_for_file, normalize_keywords};
    use crate::catalog::types::{CatalogEntry, GenerateModelRequest};
    use crate::error::PipelineError;

    use axum::{Extension, Json};
    use std::sync::Arc;

    fn entry(file_name: &str, keywords: &[&str]) -> CatalogEntry {
        CatalogEntry {
            file_name: file_name.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }

    fn furniture() -> Catalog {
        Catalog::new(
            "/nonexistent",
            vec![
                entry("chair.glb", &["chair"]),
                entry("chair_wheels.glb", &["chair", "wheels"]),
                entry("table.glb", &["table"]),
            ],
        )
    }

    // ============================================================
    // TOKENIZER TESTS
    // ============================================================

    #[test]
    fn test_keywords_from_compound_name() {
        assert_eq!(
            keywords_for_file("Office_Chair-wheels.glb"),
            vec!["office_chair-wheels", "office", "chair", "wheels"]
        );
    }

    #[test]
    fn test_keywords_skip_short_parts() {
        assert_eq!(keywords_for_file("tv_stand.glb"), vec!["tv_stand", "stand"]);
    }

    #[test]
    fn test_keywords_of_plain_name() {
        assert_eq!(keywords_for_file("lamp.glb"), vec!["lamp"]);
    }

    #[test]
    fn test_normalize_manifest_keywords() {
        let raw = vec![" Chair ".to_string(), "".to_string(), "chair".to_string()];
        assert_eq!(normalize_keywords(&raw), vec!["chair"]);
    }

    // ============================================================
    // SCORING TESTS
    // ============================================================

    #[test]
    fn test_score_counts_keyword_substrings() {
        let e = entry("chair_wheels.glb", &["chair", "wheels"]);
        assert_eq!(score(&e, "office chair with wheels"), 2);
        assert_eq!(score(&e, "armchair"), 1);
        assert_eq!(score(&e, "sofa"), 0);
    }

    #[test]
    fn test_best_match_prefers_higher_score() {
        let catalog = furniture();

        let hit = catalog.best_match("Office Chair with WHEELS").unwrap();

        assert_eq!(hit.file_name, "chair_wheels.glb");
    }

    #[test]
    fn test_best_match_tie_keeps_first_entry() {
        let catalog = furniture();

        // "chair" scores 1 for both chair entries.
        let hit = catalog.best_match("a wooden chair").unwrap();

        assert_eq!(hit.file_name, "chair.glb");
    }

    #[test]
    fn test_best_match_none_without_keywords() {
        assert!(furniture().best_match("spaceship").is_none());
        assert!(furniture().best_match("").is_none());
        assert!(Catalog::new("/nonexistent", Vec::new()).best_match("chair").is_none());
    }

    // ============================================================
    // LOADING TESTS
    // ============================================================

    #[tokio::test]
    async fn test_load_from_manifest_keeps_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(MANIFEST_FILE),
            r#"{"zebra.glb": ["Zebra", "stripes"], "apple.glb": ["apple"], "../evil.glb": ["evil"]}"#,
        )
        .unwrap();

        let catalog = Catalog::load(dir.path()).await.unwrap();

        let names: Vec<&str> = catalog.entries().iter().map(|e| e.file_name.as_str()).collect();
        assert_eq!(names, vec!["zebra.glb", "apple.glb"]);
        assert_eq!(catalog.entries()[0].keywords, vec!["zebra", "stripes"]);
    }

    #[tokio::test]
    async fn test_load_scans_directory_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["table.glb", "chair_wheels.glb", "notes.txt", "bench.glb"] {
            std::fs::write(dir.path().join(name), b"glTF").unwrap();
        }

        let catalog = Catalog::load(dir.path()).await.unwrap();

        let names: Vec<&str> = catalog.entries().iter().map(|e| e.file_name.as_str()).collect();
        assert_eq!(names, vec!["bench.glb", "chair_wheels.glb", "table.glb"]);
        assert_eq!(
            catalog.best_match("office chair with wheels").unwrap().file_name,
            "chair_wheels.glb"
        );
    }

    #[tokio::test]
    async fn test_load_missing_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = Catalog::load(dir.path().join("absent")).await.unwrap();
        assert!(catalog.is_empty());
    }

    #[tokio::test]
    async fn test_load_rejects_broken_manifest() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(MANIFEST_FILE), b"{not json").unwrap();

        assert!(Catalog::load(dir.path()).await.is_err());
    }

    #[tokio::test]
    async fn test_load_model_blocks_traversal() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("chair.glb"), b"glTF-chair").unwrap();
        let catalog = Catalog::load(dir.path()).await.unwrap();

        let (name, bytes) = catalog.load_model("chair").await.unwrap();
        assert_eq!(name, "chair.glb");
        assert_eq!(bytes, b"glTF-chair");

        assert!(matches!(
            catalog.load_model("../chair.glb").await,
            Err(PipelineError::NotFound(_))
        ));
        assert!(matches!(
            catalog.load_model("missing").await,
            Err(PipelineError::NotFound(_))
        ));
    }

    // ============================================================
    // HANDLER TESTS
    // ============================================================

    #[tokio::test]
    async fn test_generate_model_returns_url() {
        let req = GenerateModelRequest {
            prompt: "office chair with wheels".to_string(),
            x: Some(1.5),
            z: None,
        };

        let Json(resp) = handle_generate_model(Extension(Arc::new(furniture())), Json(req))
            .await
            .unwrap();

        assert_eq!(resp.status, "success");
        assert_eq!(resp.model_filename, "chair_wheels.glb");
        assert_eq!(resp.model_url, "/models/chair_wheels.glb");
        assert_eq!(resp.x, Some(1.5));
    }

    #[tokio::test]
    async fn test_generate_model_without_match_is_not_found() {
        let req = GenerateModelRequest {
            prompt: "spaceship".to_string(),
            x: None,
            z: None,
        };

        let result = handle_generate_model(Extension(Arc::new(furniture())), Json(req)).await;

        assert!(matches!(result, Err(PipelineError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_available_models_listing() {
        let Json(resp) = handle_available_models(Extension(Arc::new(furniture()))).await;

        assert_eq!(resp.count, 3);
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.find("chair.glb").unwrap() < json.find("table.glb").unwrap());
        assert_eq!(resp.models["chair_wheels.glb"], vec!["chair", "wheels"]);
    }
}
