//! Publishing through the canvas and task client traits

use std::sync::{Arc, Mutex};
use std::time::Duration;

use lanewright::plugins::{
    BoardRef, CanvasCall, CanvasClient, ConnectorRequest, Pipeline, Publisher, RecordingCanvas,
    RecordingTaskClient, RemoteId, ShapeRequest, ShapeRole, TaskCall,
};
use lanewright::{
    Clock, ElementKind, EventTrigger, GatewayKind, Jitter, NoJitter, PipelineConfig, Process,
    ProcessElement, ProcessError, ProcessFlow, RemoteApiError, RemoteErrorKind, RemoteService,
    RetryPolicy,
};

#[derive(Clone, Default)]
struct RecordingClock {
    sleeps: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingClock {
    fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

impl Clock for RecordingClock {
    fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
    }
}

struct HalfJitter;

impl Jitter for HalfJitter {
    fn factor(&self) -> f64 {
        0.5
    }
}

fn refund() -> Process {
    let mut process = Process::new("Refund");
    process.elements = vec![
        ProcessElement::start("s", "Claim received", "Support"),
        ProcessElement::task("check", "Check claim", "Support")
            .with_hint("color", "#FFE08A"),
        ProcessElement::task("pay", "Pay refund", "Finance")
            .with_description("Transfer to the original payment method"),
        ProcessElement::end("e", "Refunded", "Finance"),
    ];
    process.flows = vec![
        ProcessFlow::new("s", "check"),
        ProcessFlow::new("check", "pay"),
        ProcessFlow::new("pay", "e"),
    ];
    process
}

fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        initial_delay_ms: 100,
        max_delay_ms: 1_000,
        multiplier: 2.0,
        jitter: true,
    }
}

fn rate_limited() -> RemoteApiError {
    RemoteApiError::new(RemoteService::Canvas, RemoteErrorKind::RateLimited, "slow down")
}

// =============================================================================
// Ordering
// =============================================================================

mod ordering {
    use super::*;

    #[test]
    fn test_lanes_then_elements_then_connectors() {
        let pipeline = Pipeline::default();
        let mut publisher = pipeline
            .publisher(RecordingCanvas::new(), RecordingTaskClient::new())
            .with_clock(RecordingClock::default())
            .with_jitter(NoJitter);
        pipeline.run(&refund(), &mut publisher).unwrap();

        let roles: Vec<&str> = publisher
            .canvas()
            .calls()
            .iter()
            .map(|call| match call {
                CanvasCall::CreateBoard { .. } => "board",
                CanvasCall::CreateShape { request, .. } => match request.role {
                    ShapeRole::LaneBackground { .. } => "lane",
                    ShapeRole::Element { .. } => "element",
                    ShapeRole::BoardShape { .. } => "board_shape",
                },
                CanvasCall::CreateConnector { .. } => "connector",
            })
            .collect();
        assert_eq!(
            roles,
            vec![
                "board", "lane", "lane", "element", "element", "element", "element",
                "connector", "connector", "connector"
            ]
        );
    }

    #[test]
    fn test_hint_color_and_lane_fill() {
        let pipeline = Pipeline::default();
        let mut publisher = pipeline
            .publisher(RecordingCanvas::new(), RecordingTaskClient::new())
            .with_clock(RecordingClock::default());
        pipeline.run(&refund(), &mut publisher).unwrap();

        let shapes: Vec<&ShapeRequest> = publisher
            .canvas()
            .calls()
            .iter()
            .filter_map(|call| match call {
                CanvasCall::CreateShape { request, .. } => Some(request),
                _ => None,
            })
            .collect();
        assert!(shapes[0].fill_color.is_some());
        let check = shapes
            .iter()
            .find(|s| s.role == ShapeRole::Element { element_id: "check".to_string() })
            .unwrap();
        assert_eq!(check.fill_color.as_deref(), Some("#FFE08A"));
    }

    #[test]
    fn test_kind_symbols_sent_with_shapes() {
        let mut process = refund();
        process.elements.insert(
            2,
            ProcessElement::new("both", ElementKind::gateway(GatewayKind::Parallel), "Split")
                .with_actor("Support"),
        );
        process.elements.insert(
            3,
            ProcessElement::new("wait", ElementKind::intermediate(EventTrigger::Timer), "Wait 2 days")
                .with_actor("Finance"),
        );
        process.flows = vec![
            ProcessFlow::new("s", "check"),
            ProcessFlow::new("check", "both"),
            ProcessFlow::new("both", "pay"),
            ProcessFlow::new("both", "wait"),
            ProcessFlow::new("wait", "e"),
            ProcessFlow::new("pay", "e"),
        ];

        let pipeline = Pipeline::default();
        let mut publisher = pipeline
            .publisher(RecordingCanvas::new(), RecordingTaskClient::new())
            .with_clock(RecordingClock::default());
        pipeline.run(&process, &mut publisher).unwrap();

        let symbol_of = |id: &str| -> Option<String> {
            publisher.canvas().calls().iter().find_map(|call| match call {
                CanvasCall::CreateShape { request, .. }
                    if request.role == ShapeRole::Element { element_id: id.to_string() } =>
                {
                    Some(request.symbol.clone())
                }
                _ => None,
            })?
        };
        assert_eq!(symbol_of("both").as_deref(), Some("+"));
        assert_eq!(symbol_of("wait").as_deref(), Some("⏱"));
        assert_eq!(symbol_of("check"), None);
        assert_eq!(symbol_of("s"), None);

        let lane_symbols: Vec<&Option<String>> = publisher
            .canvas()
            .calls()
            .iter()
            .filter_map(|call| match call {
                CanvasCall::CreateShape { request, .. }
                    if matches!(request.role, ShapeRole::LaneBackground { .. }) =>
                {
                    Some(&request.symbol)
                }
                _ => None,
            })
            .collect();
        assert!(lane_symbols.iter().all(|symbol| symbol.is_none()));
    }

    #[test]
    fn test_one_task_per_task_element() {
        let pipeline = Pipeline::default();
        let mut publisher = pipeline
            .publisher(RecordingCanvas::new(), RecordingTaskClient::new())
            .with_clock(RecordingClock::default());
        let report = pipeline.run(&refund(), &mut publisher).unwrap();

        assert_eq!(report.task_ids.keys().collect::<Vec<_>>(), vec!["check", "pay"]);
        let created: Vec<&str> = publisher
            .tasks()
            .calls()
            .iter()
            .filter_map(|call| match call {
                TaskCall::CreateTask { request, .. } => Some(request.name.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(created, vec!["Check claim", "Pay refund"]);
    }
}

// =============================================================================
// Retry behaviour
// =============================================================================

mod retry {
    use super::*;

    #[test]
    fn test_backoff_doubles_between_attempts() {
        let clock = RecordingClock::default();
        let mut canvas = RecordingCanvas::new();
        canvas.fail_next(rate_limited());
        canvas.fail_next(rate_limited());

        let mut config = PipelineConfig::default();
        config.retry = fast_policy();
        let pipeline = Pipeline::new(config);
        let mut publisher = pipeline
            .publisher(canvas, RecordingTaskClient::new())
            .with_clock(clock.clone())
            .with_jitter(NoJitter);

        pipeline.run(&refund(), &mut publisher).unwrap();
        assert_eq!(
            clock.sleeps(),
            vec![Duration::from_millis(100), Duration::from_millis(200)]
        );
    }

    #[test]
    fn test_jitter_scales_delay() {
        let clock = RecordingClock::default();
        let mut canvas = RecordingCanvas::new();
        canvas.fail_next(rate_limited());

        let mut publisher = Publisher::new(canvas, RecordingTaskClient::new())
            .with_policy(fast_policy())
            .with_clock(clock.clone())
            .with_jitter(HalfJitter);
        Pipeline::default().run(&refund(), &mut publisher).unwrap();

        assert_eq!(clock.sleeps(), vec![Duration::from_millis(50)]);
    }

    #[test]
    fn test_gives_up_after_max_attempts() {
        let clock = RecordingClock::default();
        let mut canvas = RecordingCanvas::new();
        for _ in 0..3 {
            canvas.fail_next(rate_limited());
        }

        let mut publisher = Publisher::new(canvas, RecordingTaskClient::new())
            .with_policy(fast_policy())
            .with_clock(clock.clone())
            .with_jitter(NoJitter);
        let err = Pipeline::default().run(&refund(), &mut publisher).unwrap_err();

        match err {
            ProcessError::RemoteApi(remote) => {
                assert_eq!(remote.kind, RemoteErrorKind::RateLimited);
                assert!(remote.request.unwrap().starts_with("create_board"));
            }
            other => panic!("unexpected error {other}"),
        }
        assert_eq!(publisher.canvas().attempts(), 3);
        assert_eq!(clock.sleeps().len(), 2);
        assert!(publisher.tasks().calls().is_empty());
    }

    #[test]
    fn test_malformed_request_not_retried() {
        let clock = RecordingClock::default();
        let mut canvas = RecordingCanvas::new();
        canvas.fail_next(RemoteApiError::from_status(
            RemoteService::Canvas,
            400,
            "bad shape",
        ));

        let mut publisher = Publisher::new(canvas, RecordingTaskClient::new())
            .with_policy(fast_policy())
            .with_clock(clock.clone());
        let err = Pipeline::default().run(&refund(), &mut publisher).unwrap_err();

        assert!(matches!(
            err,
            ProcessError::RemoteApi(RemoteApiError {
                kind: RemoteErrorKind::MalformedRequest(400),
                ..
            })
        ));
        assert!(clock.sleeps().is_empty());
    }
}

// =============================================================================
// Custom clients
// =============================================================================

mod custom_client {
    use super::*;

    /// Canvas that shares boards through a viewer link
    #[derive(Default)]
    struct ViewerCanvas {
        inner: RecordingCanvas,
    }

    impl CanvasClient for ViewerCanvas {
        fn create_board(
            &mut self,
            name: &str,
            description: &str,
        ) -> Result<BoardRef, RemoteApiError> {
            self.inner.create_board(name, description)
        }

        fn create_shape(
            &mut self,
            board: &BoardRef,
            request: &ShapeRequest,
        ) -> Result<RemoteId, RemoteApiError> {
            self.inner.create_shape(board, request)
        }

        fn create_connector(
            &mut self,
            board: &BoardRef,
            request: &ConnectorRequest,
        ) -> Result<RemoteId, RemoteApiError> {
            self.inner.create_connector(board, request)
        }

        fn board_url(&self, board: &BoardRef) -> String {
            format!("https://viewer.invalid/{}", board.id)
        }
    }

    #[test]
    fn test_backlink_uses_client_board_url() {
        let pipeline = Pipeline::default();
        let mut publisher = pipeline
            .publisher(ViewerCanvas::default(), RecordingTaskClient::new())
            .with_clock(RecordingClock::default());
        pipeline.run(&refund(), &mut publisher).unwrap();

        let comments: Vec<&str> = publisher
            .tasks()
            .calls()
            .iter()
            .filter_map(|call| match call {
                TaskCall::AddComment { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(comments.len(), 2);
        assert!(comments
            .iter()
            .all(|c| *c == "Process diagram: https://viewer.invalid/board-1"));
    }
}
