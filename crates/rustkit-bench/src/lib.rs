//! # RustKit Bench
//!
//! Measures how long the interaction engine takes to turn native input into
//! gesture callbacks.
//!
//! A [`Fixture`] is a generated page with a row of pressable buttons, each
//! bound to its own controller. A [`Scenario`] replays one browser input
//! sequence against it. [`Runner`] times scenarios without criterion so the
//! numbers can be written to JSON and compared against a saved baseline.
//!
//! ```rust,ignore
//! use rustkit_bench::{Fixture, Runner, Scenario};
//!
//! let fixture = Fixture::new(32)?;
//! let report = Runner::new().run_all(&fixture);
//! report.print_summary();
//! ```

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use rustkit_dom::{
    Document, DomError, DomEvent, KeyboardEventData, MouseEventData, NodeId, PointerEventData,
    Rect,
};
use rustkit_interactions::{
    Binding, InteractionError, Interactions, MoveCallbacks, MoveController, PressCallbacks,
    PressController, PressOptions,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Benchmark errors.
#[derive(Error, Debug)]
pub enum BenchError {
    #[error("Fixture setup failed: {0}")]
    Setup(#[from] InteractionError),

    #[error("Fixture page is invalid: {0}")]
    Page(#[from] DomError),

    #[error("Fixture element missing: #{0}")]
    MissingElement(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Report error: {0}")]
    Report(#[from] serde_json::Error),
}

// ==================== Fixture ====================

const BUTTON_WIDTH: f64 = 80.0;
const BUTTON_HEIGHT: f64 = 32.0;

/// Generate a page with `n` focusable buttons in a single row.
pub fn generate_html(n: usize) -> String {
    let mut html = String::from("<!DOCTYPE html><html><body><div id=\"toolbar\">");
    for i in 0..n {
        html.push_str(&format!(
            "<div id=\"button-{i}\" role=\"button\" tabindex=\"0\">Button {i}</div>"
        ));
    }
    html.push_str("</div><div id=\"canvas\"></div></body></html>");
    html
}

/// A generated page whose buttons all carry a press controller, plus a
/// canvas element bound to a move controller.
pub struct Fixture {
    pub doc: Document,
    pub ctx: Interactions,
    pub buttons: Vec<NodeId>,
    pub canvas: NodeId,
    presses: Rc<Cell<u64>>,
    moves: Rc<Cell<u64>>,
    _bindings: Vec<Binding>,
    _controllers: (Vec<PressController>, MoveController),
}

impl Fixture {
    pub fn new(buttons: usize) -> Result<Self, BenchError> {
        let doc = Document::parse_html(&generate_html(buttons))?;
        let ctx = Interactions::default();
        ctx.attach(&doc);

        let presses = Rc::new(Cell::new(0));
        let moves = Rc::new(Cell::new(0));
        let mut bindings = Vec::with_capacity(buttons + 1);
        let mut controllers = Vec::with_capacity(buttons);
        let mut ids = Vec::with_capacity(buttons);

        for i in 0..buttons {
            let id = format!("button-{i}");
            let node = doc
                .get_element_by_id(&id)
                .ok_or(BenchError::MissingElement(id))?;
            doc.set_bounding_rect(
                node,
                Rect::new(i as f64 * BUTTON_WIDTH, 0.0, BUTTON_WIDTH, BUTTON_HEIGHT),
            )?;
            let counter = presses.clone();
            let controller = PressController::new(
                &doc,
                &ctx,
                PressCallbacks::new().on_press(move |_| counter.set(counter.get() + 1)),
                PressOptions::new(),
            );
            bindings.push(controller.bind(node)?);
            controllers.push(controller);
            ids.push(node);
        }

        let canvas = doc
            .get_element_by_id("canvas")
            .ok_or_else(|| BenchError::MissingElement("canvas".into()))?;
        doc.set_bounding_rect(canvas, Rect::new(0.0, 100.0, 400.0, 400.0))?;
        let counter = moves.clone();
        let mover = MoveController::new(
            &doc,
            &ctx,
            MoveCallbacks::new().on_move(move |_| counter.set(counter.get() + 1)),
        );
        bindings.push(mover.bind(canvas)?);

        debug!(buttons, "Built bench fixture");
        Ok(Self {
            doc,
            ctx,
            buttons: ids,
            canvas,
            presses,
            moves,
            _bindings: bindings,
            _controllers: (controllers, mover),
        })
    }

    /// Number of `press` callbacks fired so far.
    pub fn press_count(&self) -> u64 {
        self.presses.get()
    }

    /// Number of `move` callbacks fired so far.
    pub fn move_count(&self) -> u64 {
        self.moves.get()
    }

    fn center(&self, node: NodeId) -> (f64, f64) {
        let rect = self.doc.bounding_rect(node);
        (
            rect.left() + rect.width / 2.0,
            rect.top() + rect.height / 2.0,
        )
    }
}

// ==================== Scenarios ====================

/// One browser input sequence replayed against a [`Fixture`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scenario {
    /// pointerdown, mousedown, pointerup, mouseup, click on the first button.
    MouseClick,
    /// Enter keydown and keyup on the first button.
    KeyboardPress,
    /// A click with `detail == 0`, as a screen reader produces.
    VirtualClick,
    /// A mouse click on every button in turn.
    ToolbarSweep,
    /// A pointer drag across the canvas in `steps` moves.
    Drag { steps: u32 },
    /// Alternating keydown and pointerdown outside any bound element.
    ModalityFlip,
}

impl Scenario {
    pub fn name(&self) -> String {
        match self {
            Scenario::MouseClick => "press/mouse-click".into(),
            Scenario::KeyboardPress => "press/keyboard".into(),
            Scenario::VirtualClick => "press/virtual-click".into(),
            Scenario::ToolbarSweep => "press/toolbar-sweep".into(),
            Scenario::Drag { steps } => format!("move/drag ({steps} steps)"),
            Scenario::ModalityFlip => "modality/flip".into(),
        }
    }

    /// Replay the scenario once.
    pub fn replay(&self, fixture: &Fixture) {
        let doc = &fixture.doc;
        match *self {
            Scenario::MouseClick => {
                if let Some(&button) = fixture.buttons.first() {
                    mouse_click(fixture, button);
                }
            }
            Scenario::KeyboardPress => {
                if let Some(&button) = fixture.buttons.first() {
                    doc.dispatch(button, &DomEvent::keyboard("keydown", KeyboardEventData::key("Enter")));
                    doc.dispatch(button, &DomEvent::keyboard("keyup", KeyboardEventData::key("Enter")));
                }
            }
            Scenario::VirtualClick => {
                if let Some(&button) = fixture.buttons.first() {
                    doc.dispatch(
                        button,
                        &DomEvent::mouse("click", MouseEventData::at(0.0, 0.0).with_detail(0)),
                    );
                }
            }
            Scenario::ToolbarSweep => {
                for &button in &fixture.buttons {
                    mouse_click(fixture, button);
                }
            }
            Scenario::Drag { steps } => {
                let canvas = fixture.canvas;
                let (x, y) = fixture.center(canvas);
                doc.dispatch(canvas, &DomEvent::pointer("pointerdown", PointerEventData::mouse(x, y)));
                for step in 1..=steps {
                    let data = PointerEventData::mouse(x + step as f64, y);
                    doc.dispatch(canvas, &DomEvent::pointer("pointermove", data));
                }
                let data = PointerEventData::mouse(x + steps as f64, y);
                doc.dispatch(canvas, &DomEvent::pointer("pointerup", data));
            }
            Scenario::ModalityFlip => {
                let Some(body) = doc.body() else {
                    return;
                };
                doc.dispatch(body, &DomEvent::keyboard("keydown", KeyboardEventData::key("Tab")));
                doc.dispatch(body, &DomEvent::pointer("pointerdown", PointerEventData::mouse(1.0, 1.0)));
                doc.dispatch(body, &DomEvent::pointer("pointerup", PointerEventData::mouse(1.0, 1.0)));
            }
        }
    }

    /// Scenarios included in a default run.
    pub fn standard() -> Vec<Scenario> {
        vec![
            Scenario::MouseClick,
            Scenario::KeyboardPress,
            Scenario::VirtualClick,
            Scenario::ToolbarSweep,
            Scenario::Drag { steps: 50 },
            Scenario::ModalityFlip,
        ]
    }
}

fn mouse_click(fixture: &Fixture, node: NodeId) {
    let doc = &fixture.doc;
    let (x, y) = fixture.center(node);
    doc.dispatch(node, &DomEvent::pointer("pointerdown", PointerEventData::mouse(x, y)));
    doc.dispatch(node, &DomEvent::mouse("mousedown", MouseEventData::at(x, y)));
    doc.dispatch(node, &DomEvent::pointer("pointerup", PointerEventData::mouse(x, y)));
    doc.dispatch(node, &DomEvent::mouse("mouseup", MouseEventData::at(x, y)));
    doc.dispatch(node, &DomEvent::mouse("click", MouseEventData::at(x, y)));
}

// ==================== Timing ====================

/// Timing summary for one scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timing {
    pub name: String,
    pub iterations: u64,
    pub median_ns: u64,
    pub p95_ns: u64,
    pub min_ns: u64,
}

impl Timing {
    pub fn from_samples(name: impl Into<String>, samples: &[Duration]) -> Self {
        let mut ns: Vec<u64> = samples.iter().map(|d| d.as_nanos() as u64).collect();
        ns.sort_unstable();
        let at = |q: f64| -> u64 {
            if ns.is_empty() {
                return 0;
            }
            let index = ((ns.len() - 1) as f64 * q).round() as usize;
            ns[index]
        };
        Self {
            name: name.into(),
            iterations: ns.len() as u64,
            median_ns: at(0.5),
            p95_ns: at(0.95),
            min_ns: ns.first().copied().unwrap_or(0),
        }
    }
}

fn format_ns(ns: u64) -> String {
    match ns {
        n if n >= 1_000_000 => format!("{:.2} ms", n as f64 / 1_000_000.0),
        n if n >= 1_000 => format!("{:.2} µs", n as f64 / 1_000.0),
        n => format!("{n} ns"),
    }
}

/// Results of a full run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Report {
    pub timings: Vec<Timing>,
}

impl Report {
    pub fn print_summary(&self) {
        println!("{:36} {:>12} {:>12}", "Scenario", "Median", "p95");
        for timing in &self.timings {
            println!(
                "{:36} {:>12} {:>12}",
                timing.name,
                format_ns(timing.median_ns),
                format_ns(timing.p95_ns)
            );
        }
    }

    pub fn save_json(&self, path: &str) -> Result<(), BenchError> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn load_json(path: &str) -> Result<Self, BenchError> {
        Ok(serde_json::from_str(&std::fs::read_to_string(path)?)?)
    }

    /// Names of scenarios whose median grew by more than `tolerance`
    /// (0.1 = 10%) relative to `baseline`.
    pub fn regressions(&self, baseline: &Report, tolerance: f64) -> Vec<String> {
        self.timings
            .iter()
            .filter_map(|current| {
                let base = baseline.timings.iter().find(|b| b.name == current.name)?;
                let limit = base.median_ns as f64 * (1.0 + tolerance);
                (current.median_ns as f64 > limit).then(|| {
                    warn!(
                        scenario = %current.name,
                        baseline = base.median_ns,
                        current = current.median_ns,
                        "Gesture dispatch regressed"
                    );
                    current.name.clone()
                })
            })
            .collect()
    }
}

/// Times scenarios with a fixed warmup and sample count.
pub struct Runner {
    pub warmup: u64,
    pub iterations: u64,
}

impl Runner {
    pub fn new() -> Self {
        Self {
            warmup: 10,
            iterations: 200,
        }
    }

    pub fn with_iterations(mut self, iterations: u64) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn run(&self, fixture: &Fixture, scenario: Scenario) -> Timing {
        for _ in 0..self.warmup {
            scenario.replay(fixture);
        }
        let samples: Vec<Duration> = (0..self.iterations)
            .map(|_| {
                let start = Instant::now();
                scenario.replay(fixture);
                start.elapsed()
            })
            .collect();
        Timing::from_samples(scenario.name(), &samples)
    }

    pub fn run_all(&self, fixture: &Fixture) -> Report {
        Report {
            timings: Scenario::standard()
                .into_iter()
                .map(|scenario| self.run(fixture, scenario))
                .collect(),
        }
    }
}

impl Default for Runner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_html() {
        let html = generate_html(3);
        assert!(html.contains("id=\"button-0\""));
        assert!(html.contains("id=\"button-2\""));
        assert!(!html.contains("button-3"));
    }

    #[test]
    fn test_scenarios_fire_callbacks() {
        let fixture = Fixture::new(4).unwrap();
        Scenario::MouseClick.replay(&fixture);
        Scenario::VirtualClick.replay(&fixture);
        Scenario::KeyboardPress.replay(&fixture);
        assert_eq!(fixture.press_count(), 3);

        Scenario::ToolbarSweep.replay(&fixture);
        assert_eq!(fixture.press_count(), 7);

        Scenario::Drag { steps: 5 }.replay(&fixture);
        assert_eq!(fixture.move_count(), 5);
    }

    #[test]
    fn test_timing_percentiles() {
        let samples: Vec<Duration> = (1..=100).map(Duration::from_nanos).collect();
        let timing = Timing::from_samples("t", &samples);
        assert_eq!(timing.iterations, 100);
        assert_eq!(timing.min_ns, 1);
        assert_eq!(timing.median_ns, 51);
        assert_eq!(timing.p95_ns, 95);
    }

    #[test]
    fn test_regressions() {
        let timing = |median_ns| Timing {
            name: "press/keyboard".into(),
            iterations: 1,
            median_ns,
            p95_ns: median_ns,
            min_ns: median_ns,
        };
        let baseline = Report { timings: vec![timing(1_000)] };
        assert!(Report { timings: vec![timing(1_050)] }
            .regressions(&baseline, 0.1)
            .is_empty());
        assert_eq!(
            Report { timings: vec![timing(1_200)] }.regressions(&baseline, 0.1),
            vec!["press/keyboard".to_string()]
        );
    }

    #[test]
    fn test_format_ns() {
        assert_eq!(format_ns(500), "500 ns");
        assert_eq!(format_ns(1_500), "1.50 µs");
        assert_eq!(format_ns(2_500_000), "2.50 ms");
    }
}
