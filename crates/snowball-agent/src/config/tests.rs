#[cfg(test)]
mod tests {
    use super::super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.direction(), Direction::Both);
        assert_eq!(config.engine_config(), EngineConfig::default());
        assert!(config.filters.is_empty());
    }

    #[test]
    fn test_full_file() {
        let config = Config::parse(
            r#"
            [project]
            dir = "/tmp/review"
            name = "GNN survey"

            [snowball]
            direction = "backward"
            reference_limit = 50

            [filters]
            min_year = 2015
            keywords = ["graph", "citation"]
            venue_types = ["journal"]
            "#,
        )
        .unwrap();

        assert_eq!(config.project.dir, PathBuf::from("/tmp/review"));
        assert_eq!(config.project.name, "GNN survey");
        assert_eq!(config.direction(), Direction::Backward);

        let engine = config.engine_config();
        assert_eq!(engine.reference_limit, 50);
        assert_eq!(engine.citation_limit, 1000);
        assert!(engine.enrich_extracted_references);

        assert_eq!(config.filters.min_year, Some(2015));
        assert_eq!(config.filters.keywords, vec!["graph", "citation"]);
    }

    #[test]
    fn test_inverted_bounds_rejected() {
        let err = Config::parse("[filters]\nmin_year = 2020\nmax_year = 2010\n").unwrap_err();
        assert!(err.to_string().contains("min_year"));

        let err = Config::parse("[filters]\nmin_citations = 10\nmax_citations = 1\n").unwrap_err();
        assert!(err.to_string().contains("min_citations"));
    }

    #[test]
    fn test_unknown_direction_rejected() {
        assert!(Config::parse("[snowball]\ndirection = \"sideways\"\n").is_err());
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::from_file(dir.path().join("absent.toml")).unwrap_err();
        assert!(err.to_string().contains("Config file not found"));

        let path = dir.path().join("snowball.toml");
        std::fs::write(&path, "[project]\nname = \"From disk\"\n").unwrap();
        assert_eq!(Config::from_file(&path).unwrap().project.name, "From disk");
    }
}
