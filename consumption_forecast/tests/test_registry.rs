use consumption_forecast::models::{FeatureMatrix, ModelArtifact};
use consumption_forecast::registry::{
    latest_production, FsModelRegistry, ModelRegistry, ModelVersion, Stage,
};
use consumption_forecast::ForecastError;
use tempfile::tempdir;

#[test]
fn test_stage_parsing() {
    assert_eq!("production".parse::<Stage>().unwrap(), Stage::Production);
    assert_eq!("Staging".parse::<Stage>().unwrap(), Stage::Staging);
    assert_eq!("ARCHIVED".parse::<Stage>().unwrap(), Stage::Archived);
    assert!("live".parse::<Stage>().is_err());
    assert_eq!(Stage::Production.to_string(), "Production");
}

#[test]
fn test_latest_production_compares_numerically() {
    let versions = vec![
        ModelVersion::new("m", "9", Stage::Production),
        ModelVersion::new("m", "10", Stage::Production),
        ModelVersion::new("m", "11", Stage::Staging),
        ModelVersion::new("m", "v12", Stage::Production),
    ];
    assert_eq!(latest_production(&versions).unwrap().version, "10");
    assert!(latest_production(&versions[2..3]).is_none());
}

#[test]
fn test_register_assigns_increasing_versions() {
    let dir = tempdir().unwrap();
    let registry = FsModelRegistry::open(dir.path()).unwrap();

    let first = registry
        .register("consumption", &ModelArtifact::MovingAverage { window: 2 }, Stage::None)
        .unwrap();
    let second = registry
        .register(
            "consumption",
            &ModelArtifact::ExponentialSmoothing { alpha: 0.5 },
            Stage::Production,
        )
        .unwrap();

    assert_eq!(first.version, "1");
    assert_eq!(second.version, "2");

    let mut versions = registry.search_versions("consumption").unwrap();
    versions.sort_by_key(|v| v.numeric_version());
    assert_eq!(versions, vec![first, second]);
    assert!(registry.search_versions("unknown").unwrap().is_empty());
}

#[test]
fn test_load_production_model() {
    let dir = tempdir().unwrap();
    let registry = FsModelRegistry::open(dir.path()).unwrap();
    registry
        .register(
            "consumption",
            &ModelArtifact::Linear {
                weights: vec![0.0, 1.0],
                intercept: 1.0,
            },
            Stage::Production,
        )
        .unwrap();

    let model = registry.load("consumption", Stage::Production).unwrap();
    let features = FeatureMatrix::from_rows(&[vec![3.0, 4.0]]).unwrap();
    assert_eq!(model.predict(&features).unwrap(), vec![5.0]);
    assert_eq!(model.window_size(), Some(2));

    assert!(matches!(
        registry.load("consumption", Stage::Staging),
        Err(ForecastError::RegistryError(_))
    ));
}

#[test]
fn test_unreadable_version_is_skipped() {
    let dir = tempdir().unwrap();
    let registry = FsModelRegistry::open(dir.path()).unwrap();
    let artifact = ModelArtifact::MovingAverage { window: 2 };
    registry
        .register("consumption", &artifact, Stage::Production)
        .unwrap();
    registry
        .register("consumption", &artifact, Stage::Production)
        .unwrap();
    std::fs::write(dir.path().join("consumption/2/version.json"), "{ not json").unwrap();

    let versions = registry.search_versions("consumption").unwrap();
    assert_eq!(versions, vec![ModelVersion::new("consumption", "1", Stage::Production)]);
    assert!(registry.load("consumption", Stage::Production).is_ok());
}

#[test]
fn test_load_specific_version() {
    let dir = tempdir().unwrap();
    let registry = FsModelRegistry::open(dir.path()).unwrap();
    registry
        .register("consumption", &ModelArtifact::MovingAverage { window: 1 }, Stage::Archived)
        .unwrap();
    registry
        .register("consumption", &ModelArtifact::MovingAverage { window: 2 }, Stage::Production)
        .unwrap();

    let model = registry.load_version("consumption", "1").unwrap();
    let features = FeatureMatrix::from_rows(&[vec![3.0, 5.0]]).unwrap();
    assert_eq!(model.predict(&features).unwrap(), vec![5.0]);

    assert!(matches!(
        registry.load_version("consumption", "7"),
        Err(ForecastError::RegistryError(_))
    ));
    assert!(matches!(
        registry.load_version("consumption", "../1"),
        Err(ForecastError::ValidationError(_))
    ));
}

#[test]
fn test_transition_archives_previous_production() {
    let dir = tempdir().unwrap();
    let registry = FsModelRegistry::open(dir.path()).unwrap();
    let artifact = ModelArtifact::MovingAverage { window: 3 };
    registry
        .register("consumption", &artifact, Stage::Production)
        .unwrap();
    registry
        .register("consumption", &artifact, Stage::Staging)
        .unwrap();

    registry
        .transition_stage("consumption", "2", Stage::Production, true)
        .unwrap();

    let versions = registry.search_versions("consumption").unwrap();
    let stage_of = |v: &str| {
        versions
            .iter()
            .find(|m| m.version == v)
            .map(|m| m.stage)
            .unwrap()
    };
    assert_eq!(stage_of("1"), Stage::Archived);
    assert_eq!(stage_of("2"), Stage::Production);
    assert_eq!(latest_production(&versions).unwrap().version, "2");
}

#[test]
fn test_invalid_model_names_are_rejected() {
    let dir = tempdir().unwrap();
    let registry = FsModelRegistry::open(dir.path()).unwrap();
    for name in ["", "..", "a/b", "a\\b"] {
        assert!(matches!(
            registry.search_versions(name),
            Err(ForecastError::ValidationError(_))
        ));
    }
}

#[test]
fn test_invalid_artifact_parameters() {
    assert!(ModelArtifact::MovingAverage { window: 0 }
        .into_model("m")
        .is_err());
    assert!(ModelArtifact::ExponentialSmoothing { alpha: 1.5 }
        .into_model("m")
        .is_err());
    assert!(ModelArtifact::Linear {
        weights: vec![],
        intercept: 0.0
    }
    .into_model("m")
    .is_err());
}
