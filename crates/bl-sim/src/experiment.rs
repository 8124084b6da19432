//! Experiment descriptions and the instruction language used to write them.
//!
//! An instruction reads like `"Charge at 1C for 3 hours or until 4.3 V"`,
//! `"Hold at 4.0 V until C/10"` or `"Rest for 5 minutes (10 seconds period)"`.
//! Steps parse from and render back to that form.

use std::fmt;

use serde::Serialize;

use crate::error::{SimError, SimResult};

/// Cycle counts above this are clamped.
pub const MAX_CYCLES: usize = 100;

/// Upper bound on a step that names neither a duration nor a cutoff.
pub const DEFAULT_STEP_DURATION_S: f64 = 24.0 * 3600.0;

/// Current demand of a charge or discharge step.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub enum Rate {
    /// Multiple of nominal capacity per hour
    C(f64),
    Amps(f64),
}

impl Rate {
    pub fn current_a(self, nominal_capacity_ah: f64) -> f64 {
        match self {
            Rate::C(c) => c * nominal_capacity_ah,
            Rate::Amps(a) => a,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub enum Operation {
    Charge(Rate),
    Discharge(Rate),
    Hold { voltage_v: f64 },
    Rest,
}

/// Threshold that ends a step early.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub enum Cutoff {
    Voltage(f64),
    /// Current magnitude falls to this C-rate
    CurrentC(f64),
    CurrentAmps(f64),
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Step {
    pub operation: Operation,
    pub duration_s: Option<f64>,
    pub until: Option<Cutoff>,
    /// Reporting period; also caps the integration step
    pub period_s: Option<f64>,
}

impl Step {
    pub fn new(operation: Operation) -> Self {
        Self {
            operation,
            duration_s: None,
            until: None,
            period_s: None,
        }
    }

    pub fn lasting(mut self, seconds: f64) -> Self {
        self.duration_s = Some(seconds);
        self
    }

    pub fn until(mut self, cutoff: Cutoff) -> Self {
        self.until = Some(cutoff);
        self
    }

    pub fn with_period(mut self, seconds: f64) -> Self {
        self.period_s = Some(seconds);
        self
    }

    /// Duration the engine will integrate at most.
    pub fn max_duration_s(&self) -> f64 {
        self.duration_s.unwrap_or(DEFAULT_STEP_DURATION_S)
    }

    pub fn is_charge(&self) -> bool {
        matches!(self.operation, Operation::Charge(_))
    }

    pub fn is_discharge(&self) -> bool {
        matches!(self.operation, Operation::Discharge(_))
    }

    /// Parse one instruction.
    pub fn parse(text: &str) -> SimResult<Self> {
        let lowered = text.trim().to_ascii_lowercase();
        let fail = |why: &str| SimError::InvalidExperiment {
            what: format!("{why} in \"{}\"", text.trim()),
        };

        let (body, period_s) = match lowered.rfind('(') {
            Some(open) => {
                let inner = lowered[open + 1..]
                    .strip_suffix(')')
                    .ok_or_else(|| fail("unclosed period"))?;
                let inner = inner
                    .trim()
                    .strip_suffix("period")
                    .ok_or_else(|| fail("expected \"<duration> period\""))?;
                let period = parse_duration(inner).ok_or_else(|| fail("bad period"))?;
                (lowered[..open].trim().to_string(), Some(period))
            }
            None => (lowered, None),
        };

        let (head, until) = match body.split_once(" until ") {
            Some((head, cond)) => {
                let cutoff = parse_cutoff(cond).ok_or_else(|| fail("bad cutoff"))?;
                let head = head.trim();
                let head = head.strip_suffix(" or").unwrap_or(head);
                (head.to_string(), Some(cutoff))
            }
            None => (body, None),
        };

        let (head, duration_s) = match head.split_once(" for ") {
            Some((head, dur)) => {
                let d = parse_duration(dur).ok_or_else(|| fail("bad duration"))?;
                (head.trim().to_string(), Some(d))
            }
            None => (head, None),
        };

        let operation = if let Some(rate) = head.strip_prefix("discharge at ") {
            Operation::Discharge(parse_rate(rate).ok_or_else(|| fail("bad rate"))?)
        } else if let Some(rate) = head.strip_prefix("charge at ") {
            Operation::Charge(parse_rate(rate).ok_or_else(|| fail("bad rate"))?)
        } else if let Some(v) = head.strip_prefix("hold at ") {
            Operation::Hold {
                voltage_v: parse_voltage(v).ok_or_else(|| fail("bad hold voltage"))?,
            }
        } else if head.trim() == "rest" {
            Operation::Rest
        } else {
            return Err(fail("unknown operation"));
        };

        let step = Step {
            operation,
            duration_s,
            until,
            period_s,
        };
        step.validate()?;
        Ok(step)
    }

    pub fn validate(&self) -> SimResult<()> {
        let bad = |what: String| Err(SimError::InvalidExperiment { what });
        match self.operation {
            Operation::Charge(r) | Operation::Discharge(r) => {
                let v = match r {
                    Rate::C(v) | Rate::Amps(v) => v,
                };
                if !v.is_finite() || v <= 0.0 {
                    return bad(format!("rate must be positive, got {v}"));
                }
            }
            Operation::Hold { voltage_v } => {
                if !voltage_v.is_finite() || voltage_v <= 0.0 {
                    return bad(format!("hold voltage must be positive, got {voltage_v}"));
                }
                if !matches!(
                    self.until,
                    None | Some(Cutoff::CurrentC(_)) | Some(Cutoff::CurrentAmps(_))
                ) {
                    return bad("a hold can only end on a current cutoff".to_string());
                }
            }
            Operation::Rest => {
                if self.duration_s.is_none() {
                    return bad("rest needs a duration".to_string());
                }
                if self.until.is_some() {
                    return bad("rest cannot have a cutoff".to_string());
                }
            }
        }
        for (what, v) in [("duration", self.duration_s), ("period", self.period_s)] {
            if let Some(v) = v
                && (!v.is_finite() || v <= 0.0)
            {
                return bad(format!("{what} must be positive, got {v}"));
            }
        }
        Ok(())
    }
}

fn split_number(s: &str) -> Option<(f64, &str)> {
    let s = s.trim();
    let end = s
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-' || c == '+'))
        .unwrap_or(s.len());
    let value: f64 = s[..end].parse().ok()?;
    Some((value, s[end..].trim()))
}

fn parse_duration(s: &str) -> Option<f64> {
    let (value, unit) = split_number(s)?;
    let scale = match unit {
        "s" | "sec" | "second" | "seconds" => 1.0,
        "min" | "minute" | "minutes" => 60.0,
        "h" | "hr" | "hour" | "hours" => 3600.0,
        _ => return None,
    };
    Some(value * scale)
}

fn parse_voltage(s: &str) -> Option<f64> {
    let (value, unit) = split_number(s)?;
    (unit == "v").then_some(value)
}

fn parse_rate(s: &str) -> Option<Rate> {
    let s = s.trim();
    if let Some(den) = s.strip_prefix("c/") {
        let den: f64 = den.trim().parse().ok()?;
        return Some(Rate::C(1.0 / den));
    }
    let (value, unit) = split_number(s)?;
    match unit {
        "c" => Some(Rate::C(value)),
        "a" => Some(Rate::Amps(value)),
        _ => None,
    }
}

fn parse_cutoff(s: &str) -> Option<Cutoff> {
    let s = s.trim();
    if let Some(den) = s.strip_prefix("c/") {
        let den: f64 = den.trim().parse().ok()?;
        return Some(Cutoff::CurrentC(1.0 / den));
    }
    if let Some(mult) = s.strip_prefix("c*") {
        return Some(Cutoff::CurrentC(mult.trim().parse().ok()?));
    }
    let (value, unit) = split_number(s)?;
    match unit {
        "v" => Some(Cutoff::Voltage(value)),
        "c" => Some(Cutoff::CurrentC(value)),
        "a" => Some(Cutoff::CurrentAmps(value)),
        _ => None,
    }
}

fn fmt_duration(f: &mut fmt::Formatter<'_>, seconds: f64) -> fmt::Result {
    let plural = |n: f64| if n == 1.0 { "" } else { "s" };
    if seconds >= 3600.0 && seconds % 3600.0 == 0.0 {
        let h = seconds / 3600.0;
        write!(f, "{h} hour{}", plural(h))
    } else if seconds >= 60.0 && seconds % 60.0 == 0.0 {
        let m = seconds / 60.0;
        write!(f, "{m} minute{}", plural(m))
    } else {
        write!(f, "{seconds} second{}", plural(seconds))
    }
}

fn fmt_c_fraction(f: &mut fmt::Formatter<'_>, c: f64) -> fmt::Result {
    let inv = 1.0 / c;
    if c < 1.0 && (inv - inv.round()).abs() < 1e-9 {
        write!(f, "C/{}", inv.round())
    } else {
        write!(f, "{c}C")
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rate::C(c) => write!(f, "{c}C"),
            Rate::Amps(a) => write!(f, "{a}A"),
        }
    }
}

impl fmt::Display for Cutoff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cutoff::Voltage(v) => write!(f, "{v} V"),
            Cutoff::CurrentC(c) => fmt_c_fraction(f, *c),
            Cutoff::CurrentAmps(a) => write!(f, "{a} A"),
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.operation {
            Operation::Charge(r) => write!(f, "Charge at {r}")?,
            Operation::Discharge(r) => write!(f, "Discharge at {r}")?,
            Operation::Hold { voltage_v } => write!(f, "Hold at {voltage_v} V")?,
            Operation::Rest => write!(f, "Rest")?,
        }
        if let Some(d) = self.duration_s {
            write!(f, " for ")?;
            fmt_duration(f, d)?;
        }
        if let Some(c) = self.until {
            if self.duration_s.is_some() {
                write!(f, " or")?;
            }
            write!(f, " until {c}")?;
        }
        if let Some(p) = self.period_s {
            write!(f, " (")?;
            fmt_duration(f, p)?;
            write!(f, " period)")?;
        }
        Ok(())
    }
}

/// Ordered cycles of ordered steps.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Experiment {
    pub cycles: Vec<Vec<Step>>,
}

impl Experiment {
    /// One cycle built from instruction strings.
    pub fn from_instructions<S: AsRef<str>>(instructions: &[S]) -> SimResult<Self> {
        let steps = instructions
            .iter()
            .map(|s| Step::parse(s.as_ref()))
            .collect::<SimResult<Vec<_>>>()?;
        Self::from_cycles(vec![steps])
    }

    pub fn from_cycles(cycles: Vec<Vec<Step>>) -> SimResult<Self> {
        if cycles.is_empty() || cycles.iter().any(|c| c.is_empty()) {
            return Err(SimError::InvalidExperiment {
                what: "an experiment needs at least one non-empty cycle".to_string(),
            });
        }
        for step in cycles.iter().flatten() {
            step.validate()?;
        }
        Ok(Self { cycles })
    }

    pub fn n_cycles(&self) -> usize {
        self.cycles.len()
    }

    pub fn first_step(&self) -> Option<&Step> {
        self.cycles.first().and_then(|c| c.first())
    }

    pub fn steps(&self) -> impl Iterator<Item = &Step> {
        self.cycles.iter().flatten()
    }

    /// Rendered instructions, one inner list per cycle.
    pub fn instructions(&self) -> Vec<Vec<String>> {
        self.cycles
            .iter()
            .map(|c| c.iter().map(|s| s.to_string()).collect())
            .collect()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Mode {
    Charge,
    Discharge,
}

impl Mode {
    pub fn label(self) -> &'static str {
        match self {
            Mode::Charge => "Charge",
            Mode::Discharge => "Discharge",
        }
    }
}

/// `"{mode} at {rate}C for {duration} or until {cutoff} V"` as a one-step experiment.
pub fn single_step(mode: Mode, c_rate: f64, duration_s: f64, cutoff_v: f64) -> SimResult<Experiment> {
    let rate = Rate::C(c_rate);
    let op = match mode {
        Mode::Charge => Operation::Charge(rate),
        Mode::Discharge => Operation::Discharge(rate),
    };
    let step = Step::new(op)
        .lasting(duration_s)
        .until(Cutoff::Voltage(cutoff_v));
    Experiment::from_cycles(vec![vec![step]])
}

/// 0 becomes 1, anything above [`MAX_CYCLES`] becomes `MAX_CYCLES`.
pub fn clamp_cycles(requested: usize) -> usize {
    requested.clamp(1, MAX_CYCLES)
}

/// Two to five steps repeated as one cycle.
#[derive(Clone, Debug, PartialEq)]
pub struct CyclingProtocol {
    steps: Vec<Step>,
}

impl CyclingProtocol {
    pub fn new(steps: Vec<Step>) -> SimResult<Self> {
        if !(2..=5).contains(&steps.len()) {
            return Err(SimError::InvalidExperiment {
                what: format!("a cycle needs 2 to 5 steps, got {}", steps.len()),
            });
        }
        for step in &steps {
            step.validate()?;
        }
        Ok(Self { steps })
    }

    pub fn from_instructions<S: AsRef<str>>(instructions: &[S]) -> SimResult<Self> {
        Self::new(
            instructions
                .iter()
                .map(|s| Step::parse(s.as_ref()))
                .collect::<SimResult<Vec<_>>>()?,
        )
    }

    /// CC charge, CV hold, rest, CC discharge, rest.
    pub fn standard() -> Self {
        Self {
            steps: vec![
                Step::new(Operation::Charge(Rate::C(1.0))).until(Cutoff::Voltage(4.0)),
                Step::new(Operation::Hold { voltage_v: 4.0 }).until(Cutoff::CurrentC(0.1)),
                Step::new(Operation::Rest).lasting(300.0),
                Step::new(Operation::Discharge(Rate::C(1.0))).until(Cutoff::Voltage(2.2)),
                Step::new(Operation::Rest).lasting(300.0),
            ],
        }
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }
}

/// Repeat `protocol` for `cycles` cycles, clamped to [1, MAX_CYCLES].
pub fn cycling(protocol: &CyclingProtocol, cycles: usize) -> Experiment {
    let n = clamp_cycles(cycles);
    Experiment {
        cycles: vec![protocol.steps.clone(); n],
    }
}

/// Fitted map from a requested C-rate to the rate the solver should be
/// driven with: `y = a - b * ln(c * x - d)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VirtualRateFit {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
}

impl Default for VirtualRateFit {
    fn default() -> Self {
        // y(1) = 1
        Self {
            a: 1.0,
            b: -0.9,
            c: 2.0,
            d: 1.0,
        }
    }
}

impl VirtualRateFit {
    pub fn apply(&self, x: f64) -> SimResult<f64> {
        let arg = self.c * x - self.d;
        if !arg.is_finite() || arg <= 0.0 {
            return Err(SimError::InvalidRate {
                rate: x,
                what: "outside the domain of the rate fit",
            });
        }
        let y = self.a - self.b * arg.ln();
        if !y.is_finite() || y <= 0.0 {
            return Err(SimError::InvalidRate {
                rate: x,
                what: "maps to a non-positive virtual rate",
            });
        }
        Ok(y)
    }
}
