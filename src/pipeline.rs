use image::{DynamicImage, GrayImage, Rgb, RgbImage};
use imageproc::drawing::draw_line_segment_mut;
use tracing::{info, instrument, warn};

use crate::artifacts::ArtifactSink;
use crate::config::ScanConfig;
use crate::detection::{EdgeExtractor, QuadrilateralDetector, Resizer};
use crate::error::{DetectionFailure, RectificationError, Result, ScanError};
use crate::models::{Quadrilateral, ScaleRatio};
use crate::rectify::PerspectiveRectifier;
use crate::scan::Scanizer;

/// Artifact stage names, in the order they are written.
pub const STAGE_GRAYSCALE: &str = "grayscale";
pub const STAGE_EDGES: &str = "edges";
pub const STAGE_CONTOUR: &str = "contour";
pub const STAGE_RECTIFIED: &str = "rectified";
pub const STAGE_SCAN: &str = "scan";

const OUTLINE_COLOR: Rgb<u8> = Rgb([0, 255, 0]);

/// A fallback the pipeline took instead of failing.
#[derive(Debug, Clone, PartialEq)]
pub enum Degradation {
    /// No document outline was found; the whole frame was rectified instead.
    FullFrame(DetectionFailure),
    /// The outline could not be rectified; the resized photo was scanned as is.
    Unrectified(RectificationError),
}

/// Everything a finished run produced.
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    /// The binarized document.
    pub scan: GrayImage,
    /// The flattened colour document that was binarized.
    pub rectified: DynamicImage,
    /// Document outline in working-resolution coordinates, as detected.
    pub quadrilateral: Quadrilateral,
    pub ratio: ScaleRatio,
    pub degradations: Vec<Degradation>,
}

impl ScanOutcome {
    pub fn is_degraded(&self) -> bool {
        !self.degradations.is_empty()
    }
}

/// Where a run currently stands. Each state owns exactly what later stages need.
pub enum ScanState {
    Loaded {
        original: DynamicImage,
    },
    Resized {
        original: DynamicImage,
        working: DynamicImage,
        ratio: ScaleRatio,
    },
    EdgesExtracted {
        original: DynamicImage,
        working: DynamicImage,
        ratio: ScaleRatio,
        edges: GrayImage,
    },
    QuadrilateralFound {
        original: DynamicImage,
        working: DynamicImage,
        ratio: ScaleRatio,
        quadrilateral: Quadrilateral,
    },
    Rectified {
        rectified: DynamicImage,
        quadrilateral: Quadrilateral,
        ratio: ScaleRatio,
    },
    Scanized {
        rectified: DynamicImage,
        scan: GrayImage,
        quadrilateral: Quadrilateral,
        ratio: ScaleRatio,
    },
    Done(ScanOutcome),
}

impl ScanState {
    pub fn name(&self) -> &'static str {
        match self {
            ScanState::Loaded { .. } => "Loaded",
            ScanState::Resized { .. } => "Resized",
            ScanState::EdgesExtracted { .. } => "EdgesExtracted",
            ScanState::QuadrilateralFound { .. } => "QuadrilateralFound",
            ScanState::Rectified { .. } => "Rectified",
            ScanState::Scanized { .. } => "Scanized",
            ScanState::Done(_) => "Done",
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, ScanState::Done(_))
    }
}

/// Per-run bookkeeping shared by the transitions.
pub struct RunContext<'a> {
    sink: &'a mut dyn ArtifactSink,
    degradations: Vec<Degradation>,
}

impl<'a> RunContext<'a> {
    pub fn new(sink: &'a mut dyn ArtifactSink) -> Self {
        Self {
            sink,
            degradations: Vec::new(),
        }
    }

    pub fn degradations(&self) -> &[Degradation] {
        &self.degradations
    }

    fn save(&mut self, index: usize, stage: &str, image: &DynamicImage) -> Result<()> {
        self.sink.save(index, stage, image)
    }
}

/// The document rectification pipeline.
///
/// Stages run strictly in order on one thread: resize, edge extraction,
/// quadrilateral detection, perspective correction, binarization. Per-image
/// problems never abort a run; they are recorded as [`Degradation`]s and the
/// run continues with a fallback.
#[derive(Debug, Clone)]
pub struct Pipeline {
    resizer: Resizer,
    edges: EdgeExtractor,
    detector: QuadrilateralDetector,
    rectifier: PerspectiveRectifier,
    scanizer: Scanizer,
}

impl Pipeline {
    /// Build a pipeline, rejecting invalid configuration before anything runs.
    pub fn new(config: &ScanConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            resizer: Resizer::from_config(config),
            edges: EdgeExtractor::from_config(config),
            detector: QuadrilateralDetector::from_config(config),
            rectifier: PerspectiveRectifier::default(),
            scanizer: Scanizer::from_config(config)?,
        })
    }

    /// Fill colour for rectified pixels that fall outside the photo.
    pub fn with_background(mut self, background: Rgb<u8>) -> Self {
        self.rectifier.background = background;
        self
    }

    pub fn scanizer(&self) -> &Scanizer {
        &self.scanizer
    }

    /// Run every stage on `input`, handing each intermediate image to `sink`.
    #[instrument(skip_all, fields(width = input.width(), height = input.height()))]
    pub fn run(&self, input: DynamicImage, sink: &mut dyn ArtifactSink) -> Result<ScanOutcome> {
        if input.width() == 0 || input.height() == 0 {
            return Err(ScanError::EmptyImage {
                width: input.width(),
                height: input.height(),
            });
        }

        let mut context = RunContext::new(sink);
        let mut state = ScanState::Loaded { original: input };
        loop {
            state = self.step(state, &mut context)?;
            info!(state = state.name(), "Stage complete");
            if let ScanState::Done(outcome) = state {
                if outcome.is_degraded() {
                    warn!(
                        degradations = outcome.degradations.len(),
                        "Scan finished with reduced quality"
                    );
                }
                return Ok(outcome);
            }
        }
    }

    /// Advance a run by one transition.
    ///
    /// Only artifact I/O can fail here; detection and geometry problems take
    /// their fallback transition and are recorded in `context`.
    pub fn step(&self, state: ScanState, context: &mut RunContext<'_>) -> Result<ScanState> {
        Ok(match state {
            ScanState::Loaded { original } => {
                let (working, ratio) = self.resizer.resize(&original);
                ScanState::Resized {
                    original,
                    working,
                    ratio,
                }
            }

            ScanState::Resized {
                original,
                working,
                ratio,
            } => {
                let maps = self.edges.extract(&working);
                context.save(1, STAGE_GRAYSCALE, &DynamicImage::ImageLuma8(maps.gray))?;
                let edges = maps.edges;
                context.save(2, STAGE_EDGES, &DynamicImage::ImageLuma8(edges.clone()))?;
                ScanState::EdgesExtracted {
                    original,
                    working,
                    ratio,
                    edges,
                }
            }

            ScanState::EdgesExtracted {
                original,
                working,
                ratio,
                edges,
            } => {
                let quadrilateral = match self.detector.detect(&edges) {
                    Ok(quad) => quad,
                    Err(failure) => {
                        warn!(%failure, "No document outline, falling back to the full frame");
                        context.degradations.push(Degradation::FullFrame(failure));
                        Quadrilateral::full_frame(working.width(), working.height())
                    }
                };
                let overlay = draw_outline(&working, &quadrilateral);
                context.save(3, STAGE_CONTOUR, &DynamicImage::ImageRgb8(overlay))?;
                ScanState::QuadrilateralFound {
                    original,
                    working,
                    ratio,
                    quadrilateral,
                }
            }

            ScanState::QuadrilateralFound {
                original,
                working,
                ratio,
                quadrilateral,
            } => {
                let rectified = match self.rectifier.rectify(&original, &quadrilateral, ratio) {
                    Ok(flat) => DynamicImage::ImageRgb8(flat),
                    Err(err) => {
                        warn!(%err, "Rectification failed, using the resized photo");
                        context.degradations.push(Degradation::Unrectified(err));
                        working
                    }
                };
                context.save(4, STAGE_RECTIFIED, &rectified)?;
                ScanState::Rectified {
                    rectified,
                    quadrilateral,
                    ratio,
                }
            }

            ScanState::Rectified {
                rectified,
                quadrilateral,
                ratio,
            } => {
                let scan = self.scanizer.scanize(&rectified);
                context.save(5, STAGE_SCAN, &DynamicImage::ImageLuma8(scan.clone()))?;
                ScanState::Scanized {
                    rectified,
                    scan,
                    quadrilateral,
                    ratio,
                }
            }

            ScanState::Scanized {
                rectified,
                scan,
                quadrilateral,
                ratio,
            } => ScanState::Done(ScanOutcome {
                scan,
                rectified,
                quadrilateral,
                ratio,
                degradations: std::mem::take(&mut context.degradations),
            }),

            done @ ScanState::Done(_) => done,
        })
    }
}

/// The working image with `quad` traced on top of it.
fn draw_outline(working: &DynamicImage, quad: &Quadrilateral) -> RgbImage {
    let mut canvas = working.to_rgb8();
    let c = &quad.corners;
    for i in 0..4 {
        let (a, b) = (c[i], c[(i + 1) % 4]);
        draw_line_segment_mut(
            &mut canvas,
            (a.x as f32, a.y as f32),
            (b.x as f32, b.y as f32),
            OUTLINE_COLOR,
        );
    }
    canvas
}
