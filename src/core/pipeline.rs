//! Round-trip orchestration: translate, translate back, compare

use futures::stream::{self, Stream};
use tracing::info;

use crate::core::errors::{Result, TranslationError};
use crate::core::models::{PipelineResult, RoundTripRequest, Stage};
use crate::core::translator::Translator;

/// Runs the three stages in order, each on the previous one's output
#[derive(Clone)]
pub struct RoundTrip {
    translator: Translator,
}

impl RoundTrip {
    pub fn new(translator: Translator) -> Self {
        Self { translator }
    }

    /// Run every stage and return all three outputs, or the first error
    pub async fn run(&self, request: &RoundTripRequest) -> Result<PipelineResult> {
        let mut progress = Progress::new(self.translator.clone(), request.clone());
        let mut result = PipelineResult::default();

        while let Some(stage) = progress.advance().await? {
            match stage {
                Stage::Translated(text) => result.translated = text,
                Stage::BackTranslated(text) => result.back_translated = text,
                Stage::Review(text) => result.review = text,
                Stage::Complete => {}
            }
        }

        info!("Translation completed successfully");
        Ok(result)
    }

    /// Lazily run the stages as the stream is polled.
    ///
    /// Yields `Translated`, `BackTranslated`, `Review` and `Complete`, or a
    /// single `Err` after which the stream ends.
    pub fn stream(
        &self,
        request: RoundTripRequest,
    ) -> impl Stream<Item = Result<Stage>> + Send + 'static {
        let progress = Progress::new(self.translator.clone(), request);

        stream::unfold(Some(progress), |progress| async move {
            let mut progress = progress?;
            match progress.advance().await {
                Ok(Some(stage)) => Some((Ok(stage), Some(progress))),
                Ok(None) => None,
                Err(e) => Some((Err(e), None)),
            }
        })
    }
}

enum Step {
    Translate,
    BackTranslate { translated: String },
    Compare { back_translated: String },
    Finish,
    Done,
}

struct Progress {
    translator: Translator,
    request: RoundTripRequest,
    step: Step,
}

impl Progress {
    fn new(translator: Translator, request: RoundTripRequest) -> Self {
        Self {
            translator,
            request,
            step: Step::Translate,
        }
    }

    /// Run the next stage. A failed stage leaves the pipeline finished.
    async fn advance(&mut self) -> Result<Option<Stage>> {
        let request = &self.request;

        match std::mem::replace(&mut self.step, Step::Done) {
            Step::Translate => {
                if request.text.is_empty() {
                    return Err(TranslationError::MissingField {
                        field: "text".to_string(),
                    });
                }

                info!(
                    "Round trip: {} chars, {} -> {}, model: {}",
                    request.text.len(),
                    request.source_lang,
                    request.target_lang,
                    request.model
                );
                info!("Step 1/3: Translating to target language");
                let translated = self
                    .translator
                    .translate(
                        &request.text,
                        &request.source_lang,
                        &request.target_lang,
                        &request.model,
                    )
                    .await?;

                self.step = Step::BackTranslate {
                    translated: translated.clone(),
                };
                Ok(Some(Stage::Translated(translated)))
            }
            Step::BackTranslate { translated } => {
                info!("Step 2/3: Back-translating to source language");
                let back_translated = self
                    .translator
                    .translate(
                        &translated,
                        &request.target_lang,
                        &request.source_lang,
                        &request.model,
                    )
                    .await?;

                self.step = Step::Compare {
                    back_translated: back_translated.clone(),
                };
                Ok(Some(Stage::BackTranslated(back_translated)))
            }
            Step::Compare { back_translated } => {
                info!("Step 3/3: Comparing meanings");
                let review = self
                    .translator
                    .compare_meanings(
                        &request.text,
                        &back_translated,
                        &request.source_lang,
                        &request.model,
                    )
                    .await?;

                self.step = Step::Finish;
                Ok(Some(Stage::Review(review)))
            }
            Step::Finish => Ok(Some(Stage::Complete)),
            Step::Done => Ok(None),
        }
    }
}
