//! Step traces and the first-divergence diff used for regression
//! forensics against reference runs.

use serde::{Deserialize, Serialize};

use crate::constants::Z5;
use crate::error::SimError;

/// One per-tick snapshot. Append-only; never mutated after being pushed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceRow {
    pub step: usize,
    pub t_s: f64,
    pub gear: usize,
    pub rpm: f64,
    pub v_fps: f64,
    pub x_ft: f64,
    pub ax_ftps2: f64,
    pub hp: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clutch_slip: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drag_hp: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roll_hp: Option<f64>,
    #[serde(default)]
    pub slipping: bool,
}

/// A complete run trace.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Trace {
    pub name: String,
    pub rows: Vec<TraceRow>,
    pub et_s: f64,
    pub mph: f64,
}

/// Result of comparing two traces.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceDiff {
    /// First differing step index; None when rows match.
    pub index: Option<usize>,
    /// Field names that differ at the mismatch.
    pub keys: Vec<&'static str>,
    pub row_a: Option<TraceRow>,
    pub row_b: Option<TraceRow>,
    pub message: String,
}

impl TraceDiff {
    pub fn identical(&self) -> bool {
        self.index.is_none() && self.keys.is_empty()
    }
}

const COMPARE_KEYS: [&str; 6] = ["gear", "rpm", "v_fps", "x_ft", "ax_ftps2", "hp"];

fn key_value(row: &TraceRow, key: &str) -> f64 {
    match key {
        "gear" => row.gear as f64,
        "rpm" => row.rpm,
        "v_fps" => row.v_fps,
        "x_ft" => row.x_ft,
        "ax_ftps2" => row.ax_ftps2,
        "hp" => row.hp,
        _ => 0.0,
    }
}

/// Scan two traces tick-by-tick over the fixed key set and report the
/// first step where any value differs by more than `eps`. Zero `eps`
/// demands bit-exact agreement. Length mismatches and final-result-only
/// divergence are reported separately.
pub fn first_diff(a: &Trace, b: &Trace, eps: f64) -> TraceDiff {
    let n = a.rows.len().min(b.rows.len());

    for i in 0..n {
        let row_a = &a.rows[i];
        let row_b = &b.rows[i];
        let bad: Vec<&'static str> = COMPARE_KEYS
            .iter()
            .copied()
            .filter(|k| {
                let va = key_value(row_a, k);
                let vb = key_value(row_b, k);
                (va - vb).abs() > eps || va.is_nan() != vb.is_nan()
            })
            .collect();
        if !bad.is_empty() {
            return TraceDiff {
                index: Some(i),
                message: format!("first diff at step {}: {}", i, bad.join(", ")),
                keys: bad,
                row_a: Some(row_a.clone()),
                row_b: Some(row_b.clone()),
            };
        }
    }

    if a.rows.len() != b.rows.len() {
        return TraceDiff {
            index: Some(n),
            keys: vec!["length"],
            row_a: None,
            row_b: None,
            message: format!(
                "traces differ in length: {} vs {}",
                a.rows.len(),
                b.rows.len()
            ),
        };
    }

    let et_differs = (a.et_s - b.et_s).abs() > eps;
    let mph_differs = (a.mph - b.mph).abs() > eps;
    if et_differs || mph_differs {
        let mut keys = Vec::new();
        if et_differs {
            keys.push("et_s");
        }
        if mph_differs {
            keys.push("mph");
        }
        return TraceDiff {
            index: None,
            keys,
            row_a: None,
            row_b: None,
            message: format!(
                "final results differ: ET {} vs {}, MPH {} vs {}",
                a.et_s, b.et_s, a.mph, b.mph
            ),
        };
    }

    TraceDiff {
        index: None,
        keys: Vec::new(),
        row_a: None,
        row_b: None,
        message: "traces are identical".to_string(),
    }
}

const CSV_HEADERS: [&str; 11] = [
    "step", "t_s", "gear", "rpm", "v_fps", "x_ft", "ax_ftps2", "hp", "clutch_slip", "drag_hp",
    "roll_hp",
];

/// Render a trace as CSV, one row per step. The leading comment line
/// carries the final ET/MPH: those are rollout-corrected and trap-
/// interpolated, so they cannot be reconstructed from the rows alone.
pub fn to_csv(trace: &Trace) -> String {
    let mut out = String::with_capacity(trace.rows.len() * 96);
    out.push_str(&format!("# et_s={},mph={}\n", trace.et_s, trace.mph));
    out.push_str(&CSV_HEADERS.join(","));
    out.push('\n');
    for row in &trace.rows {
        let opt = |v: Option<f64>| v.map(|x| x.to_string()).unwrap_or_default();
        out.push_str(&format!(
            "{},{},{},{},{},{},{},{},{},{},{}\n",
            row.step,
            row.t_s,
            row.gear,
            row.rpm,
            row.v_fps,
            row.x_ft,
            row.ax_ftps2,
            row.hp,
            opt(row.clutch_slip),
            opt(row.drag_hp),
            opt(row.roll_hp),
        ));
    }
    out
}

/// Parse a trace exported by `to_csv` (or by the reference tool with the
/// same header row). Unknown columns are ignored. The final ET/MPH come
/// from the leading comment line when present; without one they fall
/// back to the last row's absolute time and raw velocity.
pub fn parse_csv(csv: &str, name: &str) -> Result<Trace, SimError> {
    let mut lines = csv.trim().lines();
    let mut et_meta: Option<f64> = None;
    let mut mph_meta: Option<f64> = None;
    let mut header_lines = 1_usize;

    let mut header = lines
        .next()
        .ok_or_else(|| SimError::Fixture("empty trace CSV".to_string()))?;
    while let Some(meta) = header.trim().strip_prefix('#') {
        for field in meta.split(',') {
            let field = field.trim();
            if let Some(v) = field.strip_prefix("et_s=") {
                et_meta = v.parse().ok();
            } else if let Some(v) = field.strip_prefix("mph=") {
                mph_meta = v.parse().ok();
            }
        }
        header = lines
            .next()
            .ok_or_else(|| SimError::Fixture("trace CSV has no header row".to_string()))?;
        header_lines += 1;
    }
    let columns: Vec<&str> = header.split(',').map(str::trim).collect();

    let mut rows = Vec::new();
    for (lineno, line) in lines.enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let values: Vec<&str> = line.split(',').map(str::trim).collect();
        let mut row = TraceRow {
            step: 0,
            t_s: 0.0,
            gear: 0,
            rpm: 0.0,
            v_fps: 0.0,
            x_ft: 0.0,
            ax_ftps2: 0.0,
            hp: 0.0,
            clutch_slip: None,
            drag_hp: None,
            roll_hp: None,
            slipping: false,
        };
        for (col, raw) in columns.iter().zip(values.iter().copied()) {
            if raw.is_empty() {
                continue;
            }
            let parse = |raw: &str| -> Result<f64, SimError> {
                raw.parse::<f64>().map_err(|_| {
                    SimError::Fixture(format!(
                        "trace CSV line {}: bad value {:?} for {}",
                        lineno + header_lines + 1,
                        raw,
                        col
                    ))
                })
            };
            match *col {
                "step" => row.step = parse(raw)? as usize,
                "t_s" => row.t_s = parse(raw)?,
                "gear" => row.gear = parse(raw)? as usize,
                "rpm" => row.rpm = parse(raw)?,
                "v_fps" => row.v_fps = parse(raw)?,
                "x_ft" => row.x_ft = parse(raw)?,
                "ax_ftps2" => row.ax_ftps2 = parse(raw)?,
                "hp" => row.hp = parse(raw)?,
                "clutch_slip" => row.clutch_slip = Some(parse(raw)?),
                "drag_hp" => row.drag_hp = Some(parse(raw)?),
                "roll_hp" => row.roll_hp = Some(parse(raw)?),
                _ => {}
            }
        }
        rows.push(row);
    }

    let (et_last, mph_last) = rows
        .last()
        .map(|r| (r.t_s, r.v_fps * Z5))
        .unwrap_or((0.0, 0.0));

    Ok(Trace {
        name: name.to_string(),
        rows,
        et_s: et_meta.unwrap_or(et_last),
        mph: mph_meta.unwrap_or(mph_last),
    })
}
