//! End-to-end assessment: record -> features -> severity -> need -> allocation

use crate::allocation::{AllocationResult, NeedEstimator, ResourceAllocator};
use crate::artifact::{shared_model, LoadedModel};
use crate::error::{ClassifierError, ReliefError};
use crate::models::{DisasterRecord, DisasterReport, NeedVector, ResourcePool};
use crate::observability::{ReliefMetrics, StructuredLogger};
use crate::predictor::{
    ClassProbabilities, OutputConfig, OutputFormatter, PredictionSource, SeverityLabeler,
    SeverityPrediction,
};
use crate::settings::ReliefSettings;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::warn;

const RULES_VERSION: &str = "rules";

/// Severity and resource need for one record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    pub prediction: SeverityPrediction,
    pub need: NeedVector,
    /// Set when a model prediction is not confident enough to act on alone
    pub low_confidence_reason: Option<String>,
}

pub struct ReliefPipeline {
    model: Option<Arc<LoadedModel>>,
    labeler: SeverityLabeler,
    allocator: ResourceAllocator,
    formatter: OutputFormatter,
    metrics: ReliefMetrics,
    logger: StructuredLogger,
}

impl ReliefPipeline {
    /// Pipeline without a model; only rule-based assessment is available
    pub fn new(settings: &ReliefSettings) -> Self {
        Self {
            model: None,
            labeler: SeverityLabeler::with_thresholds(settings.severity.clone()),
            allocator: ResourceAllocator::with_parts(
                NeedEstimator::with_policy(settings.needs.clone()),
                settings.allocation.clone(),
            ),
            formatter: OutputFormatter::with_config(OutputConfig {
                low_confidence_threshold: settings.classifier.low_confidence_threshold,
                ..OutputConfig::default()
            }),
            metrics: ReliefMetrics::new(),
            logger: StructuredLogger::new(settings.operator.clone()),
        }
    }

    /// Pipeline using the process-wide model named in the settings, if any
    pub fn from_settings(settings: &ReliefSettings) -> Result<Self, ReliefError> {
        let pipeline = Self::new(settings);
        match &settings.classifier.artifact_path {
            Some(path) => {
                let model = shared_model(path)?;
                pipeline
                    .logger
                    .log_model_loaded(&path.display().to_string(), &model.model_version, model.backend);
                Ok(pipeline.with_model(model))
            }
            None => Ok(pipeline),
        }
    }

    pub fn with_model(mut self, model: Arc<LoadedModel>) -> Self {
        self.metrics.set_model_version(&model.model_version, model.backend);
        self.model = Some(model);
        self
    }

    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    pub fn labeler(&self) -> &SeverityLabeler {
        &self.labeler
    }

    pub fn allocator(&self) -> &ResourceAllocator {
        &self.allocator
    }

    /// Model-backed assessment. Fails without a loaded model.
    pub fn assess(&self, record: &DisasterRecord) -> Result<Assessment, ReliefError> {
        let model = self.model.as_ref().ok_or(ClassifierError::Untrained)?;
        let start = Instant::now();

        let features = model.codec.encode(record)?;
        let probabilities = model.classifier.predict_proba(&features)?;
        self.metrics
            .observe_inference_latency(start.elapsed().as_secs_f64());

        let prediction = self
            .formatter
            .format(probabilities, &model.model_version, PredictionSource::Model);
        Ok(self.finish(record, prediction))
    }

    /// Rule-based assessment from deaths, people affected and damages
    pub fn assess_with_rules(&self, record: &DisasterRecord) -> Assessment {
        let label = self.labeler.label(record);
        let prediction = self.formatter.format(
            ClassProbabilities::certain(label),
            RULES_VERSION,
            PredictionSource::Rules,
        );
        self.finish(record, prediction)
    }

    /// Model assessment when possible, rules otherwise
    pub fn assess_with_fallback(&self, record: &DisasterRecord) -> Assessment {
        if self.model.is_none() {
            self.metrics.inc_rule_fallbacks();
            return self.assess_with_rules(record);
        }
        match self.assess(record) {
            Ok(assessment) => assessment,
            Err(e) => {
                warn!(error = %e, locality = %record.locality, "Model assessment failed, using rules");
                self.metrics.inc_rule_fallbacks();
                self.assess_with_rules(record)
            }
        }
    }

    fn finish(&self, record: &DisasterRecord, prediction: SeverityPrediction) -> Assessment {
        let need = self.allocator.estimator().estimate(
            prediction.label,
            &record.disaster_type,
            record.people_affected,
        );
        let low_confidence_reason = match prediction.source {
            PredictionSource::Model => self.formatter.low_confidence_reason(&prediction),
            PredictionSource::Rules => None,
        };

        let source = match prediction.source {
            PredictionSource::Model => "model",
            PredictionSource::Rules => "rules",
        };
        self.metrics.inc_predictions(prediction.label, source);
        self.logger.log_assessment(
            &location_of(record),
            prediction.label,
            prediction.confidence,
            source,
            &prediction.model_version,
        );

        Assessment {
            prediction,
            need,
            low_confidence_reason,
        }
    }

    /// Allocate `pool` across already-assessed disasters
    pub fn allocate(
        &self,
        disasters: &[DisasterReport],
        pool: &ResourcePool,
    ) -> Result<AllocationResult, ReliefError> {
        let start = Instant::now();
        let result = self.allocator.allocate(disasters, pool)?;
        self.metrics
            .observe_allocation(&result, start.elapsed().as_secs_f64());
        self.logger.log_allocation_pass(&result);
        Ok(result)
    }

    /// Assess every record, then allocate across all of them in one pass
    pub fn assess_and_allocate(
        &self,
        records: &[DisasterRecord],
        pool: &ResourcePool,
    ) -> Result<(Vec<Assessment>, AllocationResult), ReliefError> {
        let assessments: Vec<Assessment> = records
            .iter()
            .map(|r| self.assess_with_fallback(r))
            .collect();
        let reports: Vec<DisasterReport> = records
            .iter()
            .zip(&assessments)
            .map(|(record, assessment)| {
                DisasterReport::new(
                    assessment.prediction.label,
                    record.people_affected,
                    record.disaster_type.clone(),
                )
                .with_location(location_of(record))
            })
            .collect();
        let result = self.allocate(&reports, pool)?;
        Ok((assessments, result))
    }
}

fn location_of(record: &DisasterRecord) -> String {
    match (record.locality.trim(), record.region.trim()) {
        ("", "") => "Unknown".to_string(),
        ("", region) => region.to_string(),
        (locality, "") => locality.to_string(),
        (locality, region) => format!("{}, {}", locality, region),
    }
}
