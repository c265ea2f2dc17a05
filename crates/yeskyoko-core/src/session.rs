//! One upload cycle, from file selection to rendered verdict.
//!
//! ```text
//! Idle -> Reading -> Decoding -> Compositing -> Serializing
//!      -> AwaitingClassification -> Rendered(verdict)
//!                                 \-> Errored(message)
//! ```
//!
//! The session runs on a single-threaded executor. Each [`UploadSession::submit`]
//! takes a fresh generation ticket; once a newer submission starts, the older
//! one stops at its next suspension point, its in-flight classification is
//! aborted, and it never touches the session state again.

use std::cell::{Cell, RefCell};

use futures::future::{AbortHandle, Abortable};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::classify::{Classifier, ClassifyError, Verdict};
use crate::compose::{composite, CanvasFrame, ComposeError};
use crate::config::PipelineConfig;
use crate::decode::{
    extract_orientation, resize_to_fit, DecodeError, ImageDecoder, ImageSource, OrientationCode,
    SourceError,
};
use crate::encode::{to_data_uri, EncodeError};

/// Where the current upload cycle stands.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "state", content = "detail", rename_all = "kebab-case")]
pub enum UploadState {
    #[default]
    Idle,
    Reading,
    Decoding { orientation: OrientationCode },
    Compositing,
    Serializing,
    AwaitingClassification,
    Rendered(Verdict),
    Errored(String),
}

impl UploadState {
    /// Rendered and Errored end a cycle; only a new selection leaves them.
    pub fn is_terminal(&self) -> bool {
        matches!(self, UploadState::Rendered(_) | UploadState::Errored(_))
    }

    pub fn is_busy(&self) -> bool {
        !self.is_terminal() && *self != UploadState::Idle
    }
}

/// Receives session output. Implemented by the page glue.
pub trait SessionView {
    fn state_changed(&self, state: &UploadState);

    /// The composited frame, before it is serialized.
    fn frame_ready(&self, _frame: &CanvasFrame) {}

    /// Called once per session, after the first rendered verdict.
    fn first_render(&self) {}
}

/// Why an upload cycle ended without a verdict.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Compose(#[from] ComposeError),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Classify(#[from] ClassifyError),

    /// A newer selection replaced this one.
    #[error("Upload superseded by a newer selection")]
    Superseded,
}

/// Generation number of one submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

/// Owns the state of the intake page and drives upload cycles.
pub struct UploadSession<D, C, V> {
    config: PipelineConfig,
    decoder: D,
    classifier: C,
    view: V,
    state: RefCell<UploadState>,
    generation: Cell<u64>,
    in_flight: RefCell<Option<AbortHandle>>,
    interacted: Cell<bool>,
}

impl<D, C, V> UploadSession<D, C, V>
where
    D: ImageDecoder,
    C: Classifier,
    V: SessionView,
{
    pub fn new(config: PipelineConfig, decoder: D, classifier: C, view: V) -> Self {
        Self {
            config,
            decoder,
            classifier,
            view,
            state: RefCell::new(UploadState::Idle),
            generation: Cell::new(0),
            in_flight: RefCell::new(None),
            interacted: Cell::new(false),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn state(&self) -> UploadState {
        self.state.borrow().clone()
    }

    /// Whether a verdict has been rendered at least once.
    pub fn has_interacted(&self) -> bool {
        self.interacted.get()
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.generation.get() == ticket.0
    }

    /// Run one upload cycle for `source`.
    ///
    /// Failures are reported to the view as `Errored` and returned; a
    /// superseded cycle returns `PipelineError::Superseded` silently.
    pub async fn submit<S: ImageSource>(&self, source: S) -> Result<Verdict, PipelineError> {
        let ticket = self.begin();
        if let Some(name) = source.name() {
            debug!(%name, "upload selected");
        }

        match self.run(ticket, &source).await {
            Ok(verdict) => Ok(verdict),
            Err(PipelineError::Superseded) => {
                debug!(generation = ticket.0, "upload superseded");
                Err(PipelineError::Superseded)
            }
            Err(err) => {
                warn!(error = %err, "upload failed");
                // A stale cycle must not overwrite the newer one's state.
                let _ = self.transition(ticket, UploadState::Errored(err.to_string()));
                Err(err)
            }
        }
    }

    fn begin(&self) -> Ticket {
        let ticket = Ticket(self.generation.get() + 1);
        if self.state.borrow().is_busy() {
            info!(generation = ticket.0, "new selection replaces an upload in progress");
        }
        self.generation.set(ticket.0);
        if let Some(handle) = self.in_flight.borrow_mut().take() {
            debug!("aborting superseded classification");
            handle.abort();
        }
        ticket
    }

    fn ensure_current(&self, ticket: Ticket) -> Result<(), PipelineError> {
        if self.is_current(ticket) {
            Ok(())
        } else {
            Err(PipelineError::Superseded)
        }
    }

    fn transition(&self, ticket: Ticket, next: UploadState) -> Result<(), PipelineError> {
        self.ensure_current(ticket)?;
        debug!(state = ?next, "upload state");
        *self.state.borrow_mut() = next.clone();
        self.view.state_changed(&next);
        Ok(())
    }

    async fn run<S: ImageSource>(&self, ticket: Ticket, source: &S) -> Result<Verdict, PipelineError> {
        self.transition(ticket, UploadState::Reading)?;
        let bytes = source.read_bytes().await?;
        self.ensure_current(ticket)?;

        let orientation = extract_orientation(&bytes);
        match orientation {
            OrientationCode::NotJpeg => info!("not a JPEG, drawing without rotation"),
            OrientationCode::Undefined => debug!("no orientation tag, drawing without rotation"),
            OrientationCode::Tagged(_) => {}
        }
        self.transition(ticket, UploadState::Decoding { orientation })?;

        let bitmap = self.decoder.decode_image(&bytes).await?;
        drop(bytes);
        self.ensure_current(ticket)?;
        let bitmap = match self.config.max_side {
            Some(max_side) => resize_to_fit(bitmap, max_side, self.config.resize_filter)?,
            None => bitmap,
        };

        self.transition(ticket, UploadState::Compositing)?;
        let frame = composite(&bitmap, orientation)?;
        self.view.frame_ready(&frame);

        self.transition(ticket, UploadState::Serializing)?;
        let data_uri = to_data_uri(&frame, self.config.output_format, self.config.jpeg_quality)?;
        drop(frame);

        self.transition(ticket, UploadState::AwaitingClassification)?;
        let (handle, registration) = AbortHandle::new_pair();
        *self.in_flight.borrow_mut() = Some(handle);
        let outcome = Abortable::new(self.classifier.classify(data_uri), registration).await;
        if self.is_current(ticket) {
            self.in_flight.borrow_mut().take();
        }
        let response = outcome.map_err(|_| PipelineError::Superseded)??;
        self.ensure_current(ticket)?;

        let verdict = response.verdict(&self.config)?;
        info!(?verdict, faces = response.labels.len(), "classification rendered");
        self.transition(ticket, UploadState::Rendered(verdict))?;
        if !self.interacted.replace(true) {
            self.view.first_render();
        }
        Ok(verdict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::ClassificationResponse;
    use crate::compose::Rotation;
    use crate::decode::{fixtures, ImageCrateDecoder, Orientation, MINIMAL_JPEG};
    use crate::encode::{encode_jpeg, encode_png, OutputFormat};
    use futures::channel::oneshot;
    use futures::executor::{block_on, LocalPool};
    use futures::task::LocalSpawnExt;
    use std::collections::VecDeque;
    use std::rc::Rc;

    #[derive(Default)]
    struct RecordingView {
        states: RefCell<Vec<UploadState>>,
        frames: RefCell<Vec<(u32, Rotation)>>,
        first_renders: Cell<u32>,
    }

    impl SessionView for RecordingView {
        fn state_changed(&self, state: &UploadState) {
            self.states.borrow_mut().push(state.clone());
        }

        fn frame_ready(&self, frame: &CanvasFrame) {
            self.frames.borrow_mut().push((frame.side(), frame.rotation()));
        }

        fn first_render(&self) {
            self.first_renders.set(self.first_renders.get() + 1);
        }
    }

    impl SessionView for Rc<RecordingView> {
        fn state_changed(&self, state: &UploadState) {
            (**self).state_changed(state)
        }
    }

    /// Answers every request with the same body and records the uploads.
    struct StubClassifier {
        body: Result<String, String>,
        uploads: RefCell<Vec<String>>,
    }

    impl StubClassifier {
        fn responding(body: &str) -> Self {
            Self {
                body: Ok(body.to_string()),
                uploads: RefCell::default(),
            }
        }

        fn unreachable(reason: &str) -> Self {
            Self {
                body: Err(reason.to_string()),
                uploads: RefCell::default(),
            }
        }
    }

    impl Classifier for StubClassifier {
        async fn classify(&self, data_uri: String) -> Result<ClassificationResponse, ClassifyError> {
            self.uploads.borrow_mut().push(data_uri);
            match &self.body {
                Ok(body) => ClassificationResponse::from_json(body),
                Err(reason) => Err(ClassifyError::Network(reason.clone())),
            }
        }
    }

    /// Hands out responses through channels so tests control completion order.
    #[derive(Default)]
    struct PendingClassifier {
        pending: RefCell<VecDeque<oneshot::Receiver<ClassificationResponse>>>,
    }

    impl PendingClassifier {
        fn expect(&self) -> oneshot::Sender<ClassificationResponse> {
            let (tx, rx) = oneshot::channel();
            self.pending.borrow_mut().push_back(rx);
            tx
        }
    }

    impl Classifier for PendingClassifier {
        async fn classify(&self, _data_uri: String) -> Result<ClassificationResponse, ClassifyError> {
            let rx = self.pending.borrow_mut().pop_front();
            match rx {
                Some(rx) => rx.await.map_err(|_| ClassifyError::Network("cancelled".to_string())),
                None => Err(ClassifyError::Network("unexpected request".to_string())),
            }
        }
    }

    struct BrokenDecoder;

    impl ImageDecoder for BrokenDecoder {
        async fn decode_image(&self, _bytes: &[u8]) -> Result<crate::decode::DecodedImage, DecodeError> {
            Err(DecodeError::CorruptedFile("truncated scan".to_string()))
        }
    }

    /// A decodable 4x3 JPEG carrying the given orientation tag.
    fn photo_with_orientation(value: u16) -> Vec<u8> {
        let pixels: Vec<u8> = (0..4 * 3 * 3).map(|i| (i * 7) as u8).collect();
        let jpeg = encode_jpeg(&pixels, 4, 3, 90).unwrap();
        let mut tagged = jpeg[..2].to_vec();
        tagged.extend(fixtures::app1_exif(false, &[(0x0112, value)]));
        tagged.extend_from_slice(&jpeg[2..]);
        tagged
    }

    fn session<C: Classifier>(
        classifier: C,
    ) -> UploadSession<ImageCrateDecoder, C, RecordingView> {
        UploadSession::new(
            PipelineConfig::default(),
            ImageCrateDecoder,
            classifier,
            RecordingView::default(),
        )
    }

    #[test]
    fn test_positive_cycle_walks_every_state() {
        let session = session(StubClassifier::responding(r#"{"labels":[{"yeskyoko":0.85}]}"#));
        assert_eq!(session.state(), UploadState::Idle);

        let verdict = block_on(session.submit(photo_with_orientation(6))).unwrap();
        assert_eq!(verdict, Verdict::Positive);
        assert_eq!(
            *session.view().states.borrow(),
            vec![
                UploadState::Reading,
                UploadState::Decoding {
                    orientation: OrientationCode::Tagged(Orientation::Rotate90CW)
                },
                UploadState::Compositing,
                UploadState::Serializing,
                UploadState::AwaitingClassification,
                UploadState::Rendered(Verdict::Positive),
            ]
        );
        assert_eq!(*session.view().frames.borrow(), vec![(4, Rotation::Clockwise90)]);

        let uploads = session.classifier.uploads.borrow();
        assert_eq!(uploads.len(), 1);
        assert!(uploads[0].starts_with("data:image/jpeg;base64,"));
    }

    #[test]
    fn test_no_app1_draws_unrotated() {
        let session = session(StubClassifier::responding(r#"{"labels":[]}"#));
        let verdict = block_on(session.submit(MINIMAL_JPEG.to_vec())).unwrap();

        assert_eq!(verdict, Verdict::NoFaceDetected);
        assert!(session.view().states.borrow().contains(&UploadState::Decoding {
            orientation: OrientationCode::Undefined
        }));
        assert_eq!(*session.view().frames.borrow(), vec![(1, Rotation::None)]);
    }

    #[test]
    fn test_png_is_not_jpeg_but_still_uploads() {
        let png = encode_png(&[200u8; 2 * 5 * 3], 2, 5).unwrap();
        let session = session(StubClassifier::responding(r#"{"labels":[{"yeskyoko":0.2}]}"#));
        let verdict = block_on(session.submit(png)).unwrap();

        assert_eq!(verdict, Verdict::Negative);
        assert!(session.view().states.borrow().contains(&UploadState::Decoding {
            orientation: OrientationCode::NotJpeg
        }));
        assert_eq!(*session.view().frames.borrow(), vec![(5, Rotation::None)]);
    }

    #[test]
    fn test_decode_failure_stops_before_compositing() {
        let session = UploadSession::new(
            PipelineConfig::default(),
            BrokenDecoder,
            StubClassifier::responding(r#"{"labels":[]}"#),
            RecordingView::default(),
        );
        let err = block_on(session.submit(MINIMAL_JPEG.to_vec())).unwrap_err();

        assert!(matches!(err, PipelineError::Decode(_)));
        assert!(session.classifier.uploads.borrow().is_empty());
        assert!(session.view().frames.borrow().is_empty());
        assert!(!session.view().states.borrow().contains(&UploadState::Compositing));
        assert_eq!(
            session.state(),
            UploadState::Errored("Corrupted or incomplete image file: truncated scan".to_string())
        );
    }

    #[test]
    fn test_service_error_is_surfaced() {
        let session = session(StubClassifier::responding(r#"{"error":"bad image"}"#));
        let err = block_on(session.submit(photo_with_orientation(1))).unwrap_err();

        assert!(matches!(err, PipelineError::Classify(ClassifyError::Service(_))));
        assert_eq!(session.state(), UploadState::Errored("bad image".to_string()));
        assert!(!session.has_interacted());
        assert_eq!(session.view().first_renders.get(), 0);
    }

    #[test]
    fn test_network_error_is_terminal() {
        let session = session(StubClassifier::unreachable("connection refused"));
        let err = block_on(session.submit(photo_with_orientation(1))).unwrap_err();

        assert!(matches!(err, PipelineError::Classify(ClassifyError::Network(_))));
        assert_eq!(
            session.state(),
            UploadState::Errored("Network error: connection refused".to_string())
        );
        assert_eq!(session.classifier.uploads.borrow().len(), 1);
    }

    #[test]
    fn test_first_render_fires_once() {
        let session = session(StubClassifier::responding(r#"{"labels":[{"yeskyoko":0.1}]}"#));
        assert!(!session.has_interacted());

        block_on(session.submit(photo_with_orientation(3))).unwrap();
        block_on(session.submit(photo_with_orientation(8))).unwrap();

        assert!(session.has_interacted());
        assert_eq!(session.view().first_renders.get(), 1);
        assert_eq!(
            *session.view().frames.borrow(),
            vec![(4, Rotation::HalfTurn), (4, Rotation::CounterClockwise90)]
        );
    }

    #[test]
    fn test_max_side_downscales_before_compositing() {
        let mut config = PipelineConfig::default();
        config.max_side = Some(2);
        config.output_format = OutputFormat::Png;
        let session = UploadSession::new(
            config,
            ImageCrateDecoder,
            StubClassifier::responding(r#"{"labels":[]}"#),
            RecordingView::default(),
        );
        block_on(session.submit(photo_with_orientation(1))).unwrap();

        assert_eq!(*session.view().frames.borrow(), vec![(2, Rotation::None)]);
        assert!(session.classifier.uploads.borrow()[0].starts_with("data:image/png;base64,"));
    }

    #[test]
    fn test_newer_selection_supersedes_in_flight_upload() {
        let view = Rc::new(RecordingView::default());
        let session = Rc::new(UploadSession::new(
            PipelineConfig::default(),
            ImageCrateDecoder,
            PendingClassifier::default(),
            Rc::clone(&view),
        ));
        let first_reply = session.classifier.expect();
        let second_reply = session.classifier.expect();
        let results = Rc::new(RefCell::new(Vec::new()));

        let mut pool = LocalPool::new();
        let spawner = pool.spawner();
        let (s, r) = (Rc::clone(&session), Rc::clone(&results));
        spawner
            .spawn_local(async move {
                let outcome = s.submit(photo_with_orientation(6)).await;
                r.borrow_mut().push(("first", outcome.map_err(|e| e.to_string())));
            })
            .unwrap();
        pool.run_until_stalled();
        assert_eq!(session.state(), UploadState::AwaitingClassification);

        second_reply
            .send(ClassificationResponse::from_json(r#"{"labels":[{"yeskyoko":0.9}]}"#).unwrap())
            .unwrap();
        let (s, r) = (Rc::clone(&session), Rc::clone(&results));
        spawner
            .spawn_local(async move {
                let outcome = s.submit(photo_with_orientation(1)).await;
                r.borrow_mut().push(("second", outcome.map_err(|e| e.to_string())));
            })
            .unwrap();
        pool.run_until_stalled();

        // The first request was aborted, so its reply has nowhere to go.
        assert!(first_reply
            .send(ClassificationResponse::from_json(r#"{"labels":[]}"#).unwrap())
            .is_err());
        pool.run_until_stalled();

        let results = results.borrow();
        assert!(results.contains(&("second", Ok(Verdict::Positive))));
        assert!(results.contains(&(
            "first",
            Err("Upload superseded by a newer selection".to_string())
        )));
        assert_eq!(session.state(), UploadState::Rendered(Verdict::Positive));
        assert!(!view
            .states
            .borrow()
            .iter()
            .any(|s| matches!(s, UploadState::Errored(_))));
    }

    #[test]
    fn test_state_predicates() {
        assert!(!UploadState::Idle.is_busy());
        assert!(UploadState::Reading.is_busy());
        assert!(UploadState::AwaitingClassification.is_busy());
        assert!(UploadState::Rendered(Verdict::Negative).is_terminal());
        assert!(UploadState::Errored("x".to_string()).is_terminal());
        assert!(!UploadState::Idle.is_terminal());
    }
}
