//! Weighted-random analysis backend.
//!
//! Not a detector: it only reproduces the observable contract of one
//! (label set, confidence ranges, latency, occasional failure). Used by tests
//! and as the client-side fallback when the remote backend is unreachable.

use std::ops::RangeInclusive;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use exposr_core::{ImageUpload, Verdict};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::detector::{Detection, Detector};
use crate::error::DetectorError;

/// Message carried by synthetic load failures.
pub const HIGH_LOAD_MESSAGE: &str =
    "Analysis failed. Our servers are experiencing high load. Please try again in a moment.";

const HUMAN_EVIDENCE: [&str; 10] = [
    "Natural camera noise and grain patterns detected",
    "Authentic EXIF metadata with camera sensor information",
    "Realistic lighting inconsistencies typical of photography",
    "Natural compression artifacts from camera processing",
    "Organic color variations and imperfections",
    "Authentic depth of field and focus characteristics",
    "Real-world optical distortions and aberrations",
    "Natural skin texture and pore detail variations",
    "Authentic shadow patterns and light physics",
    "Genuine environmental reflections and lighting",
];

const AI_EVIDENCE: [&str; 12] = [
    "Signature smoothing patterns typical of diffusion models",
    "Abnormal pixel distributions consistent with GAN generation",
    "Missing or corrupted EXIF metadata",
    "Over-perfect symmetry uncommon in natural photography",
    "Telltale compression artifacts from AI upscaling",
    "Unnatural color gradients typical of neural networks",
    "Anatomical inconsistencies common in AI generation",
    "Repetitive texture patterns characteristic of AI models",
    "Impossible lighting scenarios that defy physics",
    "Blending artifacts around object boundaries",
    "Facial features showing AI generation hallmarks",
    "Background elements with AI-typical distortions",
];

const INCONCLUSIVE_EVIDENCE: [&str; 8] = [
    "Mixed compression signatures from multiple sources",
    "Partial metadata suggesting post-processing",
    "Some regions show AI characteristics, others appear natural",
    "Ambiguous texture patterns that could be either source",
    "Conflicting evidence from different analysis methods",
    "Low resolution limiting detailed analysis capability",
    "Heavy post-processing masking original source indicators",
    "Quality degradation affecting detection accuracy",
];

/// The three outcome classes of the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    Human,
    Ai,
    Inconclusive,
}

impl Bucket {
    pub fn verdict(self) -> Verdict {
        match self {
            Self::Human => Verdict::LikelyHuman,
            Self::Ai => Verdict::AiGenerated,
            Self::Inconclusive => Verdict::Inconclusive,
        }
    }

    pub fn confidence_range(self) -> RangeInclusive<u8> {
        match self {
            Self::Human => 75..=94,
            Self::Ai => 70..=94,
            Self::Inconclusive => 45..=74,
        }
    }

    pub fn explanation(self) -> &'static str {
        match self {
            Self::Human => "This image appears to be created by a human. No AI traces found.",
            Self::Ai => {
                "AI-generated image detected. This image shows traits consistent with diffusion models like Midjourney or DALL·E."
            }
            Self::Inconclusive => {
                "Analysis inconclusive. This image has both real and synthetic characteristics."
            }
        }
    }

    pub fn evidence_pool(self) -> &'static [&'static str] {
        match self {
            Self::Human => &HUMAN_EVIDENCE,
            Self::Ai => &AI_EVIDENCE,
            Self::Inconclusive => &INCONCLUSIVE_EVIDENCE,
        }
    }

    fn technical_details(self) -> [(&'static str, &'static str); 3] {
        match self {
            Self::Human => [
                ("exifData", "Present and valid"),
                ("compressionType", "Camera-native JPEG"),
                ("noiseAnalysis", "Natural sensor noise detected"),
            ],
            Self::Ai => [
                ("exifData", "Missing or synthetic"),
                ("compressionType", "AI-processed compression"),
                ("noiseAnalysis", "Artificial noise patterns"),
            ],
            Self::Inconclusive => [
                ("exifData", "Partially present"),
                ("compressionType", "Mixed compression signatures"),
                ("noiseAnalysis", "Ambiguous noise patterns"),
            ],
        }
    }
}

/// Tunables for [`SimulatedDetector`].
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationProfile {
    pub human_weight: f64,
    pub ai_weight: f64,
    pub inconclusive_weight: f64,
    pub min_latency: Duration,
    pub max_latency: Duration,
    /// Probability in `[0, 1]` of a synthetic transient failure.
    pub failure_rate: f64,
}

impl Default for SimulationProfile {
    /// 45/35/20 split, 1.5-3 s latency, 10% failures.
    fn default() -> Self {
        Self {
            human_weight: 0.45,
            ai_weight: 0.35,
            inconclusive_weight: 0.20,
            min_latency: Duration::from_millis(1500),
            max_latency: Duration::from_millis(3000),
            failure_rate: 0.10,
        }
    }
}

impl SimulationProfile {
    /// Default weights with no latency and no failures.
    pub fn instant() -> Self {
        Self {
            min_latency: Duration::ZERO,
            max_latency: Duration::ZERO,
            failure_rate: 0.0,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_weights(mut self, human: f64, ai: f64, inconclusive: f64) -> Self {
        self.human_weight = human;
        self.ai_weight = ai;
        self.inconclusive_weight = inconclusive;
        self
    }

    #[must_use]
    pub fn with_latency(mut self, min: Duration, max: Duration) -> Self {
        self.min_latency = min;
        self.max_latency = max.max(min);
        self
    }

    #[must_use]
    pub fn with_failure_rate(mut self, rate: f64) -> Self {
        self.failure_rate = rate.clamp(0.0, 1.0);
        self
    }
}

/// Everything decided by one roll of the dice, computed under the lock.
struct Roll {
    latency: Duration,
    outcome: Result<(Bucket, u8, Vec<String>), ()>,
}

/// Weighted-random stand-in for a real analysis backend.
pub struct SimulatedDetector {
    profile: SimulationProfile,
    rng: Mutex<StdRng>,
    call_count: AtomicUsize,
}

impl SimulatedDetector {
    pub fn new(profile: SimulationProfile) -> Self {
        Self {
            profile,
            rng: Mutex::new(StdRng::from_entropy()),
            call_count: AtomicUsize::new(0),
        }
    }

    /// Deterministic sequence of outcomes for tests.
    pub fn with_seed(profile: SimulationProfile, seed: u64) -> Self {
        Self {
            profile,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            call_count: AtomicUsize::new(0),
        }
    }

    pub fn profile(&self) -> &SimulationProfile {
        &self.profile
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    fn pick_bucket(&self, rng: &mut StdRng) -> Bucket {
        let p = &self.profile;
        let total = p.human_weight + p.ai_weight + p.inconclusive_weight;
        if total <= 0.0 {
            return Bucket::Inconclusive;
        }
        let r = rng.r#gen::<f64>() * total;
        if r < p.human_weight {
            Bucket::Human
        } else if r < p.human_weight + p.ai_weight {
            Bucket::Ai
        } else {
            Bucket::Inconclusive
        }
    }

    fn roll(&self) -> Roll {
        let mut rng = self.rng.lock();

        let latency = if self.profile.max_latency > self.profile.min_latency {
            rng.gen_range(self.profile.min_latency..=self.profile.max_latency)
        } else {
            self.profile.min_latency
        };

        if rng.r#gen::<f64>() < self.profile.failure_rate {
            return Roll {
                latency,
                outcome: Err(()),
            };
        }

        let bucket = self.pick_bucket(&mut rng);
        let confidence = rng.gen_range(bucket.confidence_range());
        let count = rng.gen_range(3..=4);
        let evidence = bucket
            .evidence_pool()
            .choose_multiple(&mut *rng, count)
            .map(|&s| s.to_owned())
            .collect();

        Roll {
            latency,
            outcome: Ok((bucket, confidence, evidence)),
        }
    }
}

impl Default for SimulatedDetector {
    fn default() -> Self {
        Self::new(SimulationProfile::default())
    }
}

impl Detector for SimulatedDetector {
    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "simulated"
    }

    async fn detect(&self, upload: &ImageUpload) -> Result<Detection, DetectorError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        let roll = self.roll();

        if !roll.latency.is_zero() {
            tokio::time::sleep(roll.latency).await;
        }

        let Ok((bucket, confidence, evidence)) = roll.outcome else {
            debug!(filename = %upload.filename, "simulated load failure");
            return Err(DetectorError::Transient(HIGH_LOAD_MESSAGE.to_owned()));
        };

        let mut details = serde_json::Map::new();
        for (key, value) in bucket.technical_details() {
            details.insert(key.to_owned(), value.into());
        }
        details.insert(
            "format".to_owned(),
            upload
                .declared_kind()
                .map_or("UNKNOWN", exposr_core::ImageKind::label)
                .into(),
        );
        details.insert(
            "processingTime".to_owned(),
            format!("{:.2}s", roll.latency.as_secs_f64()).into(),
        );

        Ok(Detection {
            verdict: bucket.verdict(),
            confidence,
            is_ai: bucket == Bucket::Ai,
            explanation: bucket.explanation().to_owned(),
            evidence,
            raw: Some(serde_json::Value::Object(details)),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn upload() -> ImageUpload {
        ImageUpload::new("x.png", "image/png", vec![0x89, 0x50, 0x4E, 0x47])
    }

    #[tokio::test]
    async fn results_stay_within_contract() {
        let detector = SimulatedDetector::with_seed(SimulationProfile::instant(), 7);
        for _ in 0..200 {
            let d = detector.detect(&upload()).await.unwrap();
            assert!((45..=94).contains(&d.confidence));
            assert!(Verdict::ALL.contains(&d.verdict));
            assert!((3..=4).contains(&d.evidence.len()));

            let unique: HashSet<_> = d.evidence.iter().collect();
            assert_eq!(unique.len(), d.evidence.len(), "evidence drawn without replacement");

            let bucket = match d.verdict {
                Verdict::LikelyHuman => Bucket::Human,
                Verdict::AiGenerated => Bucket::Ai,
                Verdict::Inconclusive => Bucket::Inconclusive,
            };
            assert!(bucket.confidence_range().contains(&d.confidence));
            assert!(d.evidence.iter().all(|e| bucket.evidence_pool().contains(&e.as_str())));
            assert_eq!(d.is_ai, bucket == Bucket::Ai);
            assert_eq!(d.explanation, bucket.explanation());
        }
        assert_eq!(detector.call_count(), 200);
    }

    #[tokio::test]
    async fn weights_shape_distribution() {
        let detector = SimulatedDetector::with_seed(SimulationProfile::instant(), 42);
        let mut human = 0;
        let mut ai = 0;
        let mut inconclusive = 0;
        for _ in 0..2000 {
            match detector.detect(&upload()).await.unwrap().verdict {
                Verdict::LikelyHuman => human += 1,
                Verdict::AiGenerated => ai += 1,
                Verdict::Inconclusive => inconclusive += 1,
            }
        }
        assert!((700..1100).contains(&human), "human={human}");
        assert!((500..900).contains(&ai), "ai={ai}");
        assert!((250..550).contains(&inconclusive), "inconclusive={inconclusive}");
    }

    #[tokio::test]
    async fn single_bucket_profile() {
        let profile = SimulationProfile::instant().with_weights(0.0, 1.0, 0.0);
        let detector = SimulatedDetector::with_seed(profile, 1);
        for _ in 0..20 {
            let d = detector.detect(&upload()).await.unwrap();
            assert_eq!(d.verdict, Verdict::AiGenerated);
            assert!(d.is_ai);
        }
    }

    #[tokio::test]
    async fn always_failing_profile() {
        let profile = SimulationProfile::instant().with_failure_rate(1.0);
        let detector = SimulatedDetector::with_seed(profile, 3);
        let err = detector.detect(&upload()).await.unwrap_err();
        assert!(err.is_transient());
        assert_eq!(err.to_string(), HIGH_LOAD_MESSAGE);
    }

    #[tokio::test(start_paused = true)]
    async fn latency_is_simulated() {
        let profile = SimulationProfile::default().with_failure_rate(0.0);
        let detector = SimulatedDetector::with_seed(profile, 9);
        let started = tokio::time::Instant::now();
        let d = detector.detect(&upload()).await.unwrap();
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(1500), "elapsed={elapsed:?}");
        assert!(elapsed <= Duration::from_millis(3100), "elapsed={elapsed:?}");
        let details = d.raw.unwrap();
        assert_eq!(details["format"], "PNG");
        assert!(details["processingTime"].as_str().unwrap().ends_with('s'));
    }
}
