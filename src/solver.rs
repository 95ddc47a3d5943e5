//! Step integrator: the central fixed-time-step loop.
//!
//! Each tick estimates the next velocity from the previous acceleration
//! and jerk, resolves driveline and engine RPM through the coupling,
//! looks up corrected engine power, subtracts drag and rotational-inertia
//! reaction power, and iterates that chain (bounded at 12 passes) until
//! the acceleration estimate stabilizes. The converged acceleration is
//! clamped to the traction ceiling, velocity and position advance by the
//! fixed step, and trace rows and timeslip checkpoints are appended.
//!
//! In strict mode the arithmetic chain runs through the single-precision
//! contract and the traction clamp uses the legacy reflective form; in
//! tolerant mode the math stays f64 and the clamp clips flat.

use serde::Serialize;
use tracing::{debug, warn};

use crate::air::{air_density, hp_correction};
use crate::constants::{
    AMIN, CMU, CMUK, CONVERGENCE_BUDGET, CONVERGENCE_TOL_PCT, FRCT, GC, HP_TO_FTLBPS, JMAX, JMIN,
    K6, K61, KP21, KP22, PI, Z5, Z6,
};
use crate::drivetrain::{tire_slip_factor, tire_state, track_temp_effect};
use crate::engine::{apply_rev_limiter, throttle_stop_multiplier};
use crate::error::SimError;
use crate::f32math::fw;
use crate::input::{EnvironmentSpec, RaceLength, VehicleSpec};
use crate::launch::{effective_rollout_in, timed_distance_ft};
use crate::shift::{advance, should_shift, ShiftState};
use crate::trace::{Trace, TraceRow};
use crate::traction;

/// Integrator options.
#[derive(Debug, Clone)]
pub struct SimOptions {
    /// Bit-exact legacy arithmetic and clamping.
    pub strict: bool,
    /// Fixed time step (s).
    pub dt_s: f64,
    /// Simulated-time budget (s).
    pub max_sim_time_s: f64,
    /// Step budget.
    pub max_steps: usize,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            strict: true,
            dt_s: 0.002,
            max_sim_time_s: 60.0,
            max_steps: 100_000,
        }
    }
}

/// Why the run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Termination {
    /// Timed distance reached the race length.
    Finished,
    StepBudgetExceeded,
    TimeBudgetExceeded,
}

/// A (distance, time, speed) triple recorded once per milestone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimeslipCheckpoint {
    pub distance_ft: f64,
    pub time_s: f64,
    pub speed_mph: f64,
}

/// Energy ledger in ft·lbf, accumulated per tick from the power chain.
/// The residual is the part of engine input not explained by the listed
/// buckets plus final kinetic energy; it should stay within a small
/// fraction of the input.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct EnergyBreakdown {
    pub engine_input: f64,
    pub aero_drag_loss: f64,
    pub rolling_loss: f64,
    pub driveline_loss: f64,
    pub engine_rotational: f64,
    pub chassis_rotational: f64,
    pub wheelspin_loss: f64,
    pub final_kinetic: f64,
    pub residual: f64,
}

impl EnergyBreakdown {
    /// Residual as a fraction of engine input.
    pub fn residual_fraction(&self) -> f64 {
        if self.engine_input > 0.0 {
            self.residual.abs() / self.engine_input
        } else {
            0.0
        }
    }
}

/// Immutable result of a run.
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub model: &'static str,
    /// Elapsed time on the ET clock (rollout excluded).
    pub et_s: f64,
    /// Speed at the end of the measured distance.
    pub trap_mph: f64,
    pub checkpoints: Vec<TimeslipCheckpoint>,
    #[serde(skip)]
    pub trace: Trace,
    pub termination: Termination,
    pub warnings: Vec<String>,
    pub convergence_overruns: usize,
    pub energy: EnergyBreakdown,
    pub steps: usize,
}

pub const MODEL_ID: &str = "quartersim-legacy-v1";

/// Arithmetic selector: strict runs narrow every operation to single
/// precision, tolerant runs stay in f64.
#[derive(Clone, Copy)]
struct Arith {
    strict: bool,
}

impl Arith {
    #[inline(always)]
    fn n(&self, x: f64) -> f64 {
        if self.strict {
            fw(x)
        } else {
            x
        }
    }
    #[inline(always)]
    fn add(&self, a: f64, b: f64) -> f64 {
        self.n(self.n(a) + self.n(b))
    }
    #[inline(always)]
    fn sub(&self, a: f64, b: f64) -> f64 {
        self.n(self.n(a) - self.n(b))
    }
    #[inline(always)]
    fn mul(&self, a: f64, b: f64) -> f64 {
        self.n(self.n(a) * self.n(b))
    }
    #[inline(always)]
    fn div(&self, a: f64, b: f64) -> f64 {
        self.n(self.n(a) / self.n(b))
    }
}

/// Run one simulation. Pure and deterministic: identical inputs produce
/// bit-identical traces.
pub fn simulate(
    vehicle: &VehicleSpec,
    env: &EnvironmentSpec,
    race: RaceLength,
    opts: &SimOptions,
) -> Result<RunResult, SimError> {
    vehicle.validate()?;

    let ar = Arith { strict: opts.strict };
    let dt = opts.dt_s;
    let weight = vehicle.weight_lb;
    let n_gears = vehicle.gear_count();
    let race_len = race.length_ft();

    // Environment, fixed for the run
    let sample = air_density(&crate::air::AirConditions {
        elevation_ft: env.elevation_ft,
        barometer_in_hg: env.barometer_in_hg,
        temperature_f: env.temperature_f,
        humidity_pct: env.humidity_pct,
    });
    let rho = sample.density_lbm_ft3;
    let hpc = hp_correction(
        &crate::air::AirConditions {
            elevation_ft: env.elevation_ft,
            barometer_in_hg: env.barometer_in_hg,
            temperature_f: env.temperature_f,
            humidity_pct: env.humidity_pct,
        },
        vehicle.fuel,
    )
    .hp_correction;
    let tte = track_temp_effect(env.track_temp_f);
    let wind_fps0 = env.wind_mph / Z5;
    let wind_cos = (PI * env.wind_angle_deg / 180.0).cos();
    let caxi = traction::caxi(env.traction_index, tte);
    let is_clutch = vehicle.coupling.is_clutch();
    let kp2 = if is_clutch { KP21 } else { KP22 };
    let rollout_in = effective_rollout_in(vehicle.rollout_in, vehicle.deep_stage_in);

    // Launch state
    let launch_rpm = vehicle.coupling.launch_rpm();
    let stall_rpm = vehicle.coupling.stall_rpm();
    let hp_launch =
        vehicle.hp_tq_mult * vehicle.power_curve.hp_at(launch_rpm) / hpc;
    let tq_launch = Z6 * hp_launch / launch_rpm
        * vehicle.coupling.torque_mult()
        * vehicle.gear_ratios[0]
        * vehicle.gear_efficiencies[0];
    let tire_slip0 = 1.02 + (env.traction_index - 1.0) * 0.005 + (tte - 1.0) * 3.0;
    let q0 = rho * wind_fps0 * wind_fps0 / (2.0 * GC);
    let drag0 = CMU * weight + vehicle.drag_coeff * vehicle.frontal_area_ft2 * q0;
    let force0 = tq_launch * vehicle.final_drive * vehicle.overall_efficiency
        / (tire_slip0 * vehicle.tire_diameter_in / 24.0)
        - drag0;
    let loss_factor = if is_clutch { 0.88 } else { 0.96 };
    let mut ags0 = loss_factor * force0 / weight;

    // Static traction ceiling at launch
    let rear_bias = 1.0 - vehicle.static_front_weight_lb / weight;
    let mut static_rwt = traction::normal_force(weight, rear_bias);
    if static_rwt < 0.0 {
        static_rwt = weight;
    }
    let mut crtf0 = traction::crtf(
        caxi,
        vehicle.tire_diameter_in,
        vehicle.tire_width_in,
        static_rwt,
    );
    if vehicle.motorcycle {
        crtf0 *= 0.5;
    }
    let amax0 = traction::a_max(crtf0, 1.0, drag0, weight);
    ags0 = ags0.clamp(AMIN, amax0.max(AMIN));

    // Mutable loop state
    let mut t = 0.0_f64;
    let mut v = 0.001_f64;
    let mut x = 0.0_f64;
    let mut ags = ags0;
    let mut eng_rpm = launch_rpm;
    let mut dsrpm = 0.0_f64;
    let mut gear = 0_usize;

    let mut t0 = 0.0_f64;

    let mut shift_state = ShiftState::Normal;
    let mut dwell_until = -1.0_f64;

    let mut rows: Vec<TraceRow> = Vec::with_capacity(4096);
    let mut checkpoints: Vec<TimeslipCheckpoint> = Vec::new();
    let mut marks = race.checkpoints_ft().into_iter().peekable();
    let mut rollout_clock: Option<f64> = None;
    let mut warnings: Vec<String> = Vec::new();
    let mut overruns = 0_usize;
    let mut energy = EnergyBreakdown::default();
    let mut termination = Termination::StepBudgetExceeded;
    let mut et_s = 0.0_f64;
    let mut trap_mph = 0.0_f64;

    let mut step = 1_usize;
    loop {
        if step > opts.max_steps {
            termination = Termination::StepBudgetExceeded;
            break;
        }
        if t > opts.max_sim_time_s {
            termination = Termination::TimeBudgetExceeded;
            break;
        }

        let in_dwell = t < dwell_until;

        // Jerk from the previous two accelerations
        let mut jerk = 0.0;
        if t - t0 > 0.0 {
            jerk = (ags - ags0) / (t - t0);
        }
        jerk = jerk.clamp(JMIN, JMAX);

        // Save previous state
        let v0 = v;
        ags0 = ags;
        t0 = t;
        let x0 = x;
        let mut rpm0 = eng_rpm;
        let dsrpm0 = dsrpm;

        // First step: the engine flares from launch RPM to the coupling
        // stall before the car moves; charge the spool-up time
        if step == 1 && rpm0 == launch_rpm && t0 == 0.0 {
            rpm0 = stall_rpm;
            if launch_rpm < stall_rpm {
                t0 = vehicle.pmi.engine_flywheel_clutch * (stall_rpm - launch_rpm) / 250_000.0;
                t = t0;
            }
        }

        let tire = tire_state(
            vehicle.tire_diameter_in,
            vehicle.tire_width_in,
            v0,
            ags0,
        );
        let tire_slip = tire_slip_factor(x0, env.traction_index, tte);
        let gear_ratio = vehicle.gear_ratios[gear.min(n_gears - 1)];
        let gear_eff = vehicle.gear_efficiencies[gear.min(n_gears - 1)];
        let chassis_pmi = vehicle.pmi.tires_wheels_ring_gear
            + vehicle.pmi.transmission_driveshaft
                * vehicle.final_drive.powi(2)
                * gear_ratio.powi(2);

        // First velocity estimate from previous acceleration and jerk
        let mut vel_est = ar.add(
            ar.add(v0, ar.mul(ar.mul(ags0, GC), dt)),
            ar.mul(ar.mul(jerk, GC), ar.mul(dt, dt) / 2.0),
        );
        if vel_est < 0.0 {
            vel_est = 0.0;
        }

        // Cap the estimate so the shift RPM is not overshot mid-step
        if !in_dwell && gear + 1 < n_gears && v0 > 0.0 && rpm0 > stall_rpm {
            let vel_at_shift = v0 * (vehicle.shift_rpm[gear] + 5.0) / rpm0;
            if vel_est > vel_at_shift {
                vel_est = vel_at_shift;
            }
        }

        // Per-step drive-chain state, refined by the convergence loop
        let mut hp_save = 0.0;
        let mut clutch_slip = 0.0;
        let mut drag_hp = 0.0;
        let mut roll_hp;
        let mut aero_hp = 0.0;
        let mut hp_eng_pmi = 0.0;
        let mut hp_chas_pmi = 0.0;
        let mut hp_net = 0.0;
        let mut pqwt = AMIN * GC * vel_est.max(0.001);
        let mut slipping = false;
        let mut gross_after_coupling = 0.0;
        let mut after_gears = 0.0;
        let mut after_tire_slip = 0.0;

        roll_hp = 0.0;

        let a_min_eff = if in_dwell { f64::NEG_INFINITY } else { AMIN };
        let mut converged = false;

        for k in 1..=CONVERGENCE_BUDGET {
            let vel_use = vel_est.max(0.001);

            // Driveline and engine RPM at the current velocity estimate
            dsrpm = ar.div(ar.mul(ar.mul(tire_slip, vel_est), 60.0), tire.circumference_ft);
            let lock_rpm = ar.mul(ar.mul(dsrpm, vehicle.final_drive), gear_ratio);
            let coupled = vehicle.coupling.resolve(lock_rpm, gear, step);
            eng_rpm = ar.n(coupled.engine_rpm);
            clutch_slip = if in_dwell { 0.0 } else { coupled.slip_factor };

            // Corrected engine power
            let mut hp = vehicle.power_curve.hp_at(eng_rpm);
            hp = ar.div(ar.mul(vehicle.hp_tq_mult, hp), hpc);
            hp = apply_rev_limiter(hp, eng_rpm, vehicle.rev_limiter_rpm);
            hp = ar.mul(hp, throttle_stop_multiplier(t0, vehicle.throttle_stop.as_ref()));
            if in_dwell {
                hp = 0.0;
            }
            hp_save = hp;

            // Drag at the current velocity estimate
            let wind_fps = (vel_est * vel_est
                + 2.0 * vel_est * wind_fps0 * wind_cos
                + wind_fps0 * wind_fps0)
                .max(0.0)
                .sqrt();
            let q = ar.n(rho * wind_fps * wind_fps / (2.0 * GC));
            let tire_area = (tire.growth - 1.0) * vehicle.tire_diameter_in / 2.0;
            let ref_area2 = if vehicle.motorcycle {
                vehicle.frontal_area_ft2 + tire_area * vehicle.tire_width_in / 144.0
            } else {
                vehicle.frontal_area_ft2 + tire_area * (2.0 * vehicle.tire_width_in) / 144.0
            };
            let downforce = ar.n(weight + vehicle.lift_coeff * ref_area2 * q);
            let cmu1 = CMU - (x0 / 1320.0) * CMUK;
            let roll_force =
                ar.n(cmu1 * downforce + 0.0001 * downforce * (Z5 * vel_est));
            let aero_force = ar.n(vehicle.drag_coeff * ref_area2 * q);
            let drag_force = ar.add(roll_force, aero_force);
            drag_hp = ar.div(ar.mul(drag_force, vel_est), HP_TO_FTLBPS);
            roll_hp = roll_force * vel_est / HP_TO_FTLBPS;
            aero_hp = aero_force * vel_est / HP_TO_FTLBPS;

            // Dynamic weight transfer and the traction ceiling
            let tire_rad_in = 12.0 * tire.circumference_ft / (2.0 * PI);
            let delta_fwt = (ags0 * weight
                * ((vehicle.cg_height_in - tire_rad_in)
                    + (FRCT / vehicle.overall_efficiency) * tire_rad_in)
                + drag_force * vehicle.cg_height_in)
                / vehicle.wheelbase_in;
            let mut dyn_fwt = vehicle.static_front_weight_lb - delta_fwt;
            let mut wheelie_bar = 0.0;
            if dyn_fwt < 0.0 {
                wheelie_bar = -dyn_fwt * vehicle.wheelbase_in / 64.0;
                dyn_fwt = 0.0;
            }
            let mut dyn_rwt = downforce - dyn_fwt - wheelie_bar;
            if dyn_rwt < 0.0 {
                dyn_rwt = weight;
            }
            let mut crtf = traction::crtf(
                caxi,
                vehicle.tire_diameter_in,
                vehicle.tire_width_in,
                dyn_rwt,
            );
            if vehicle.motorcycle {
                crtf *= 0.5;
            }
            let amax = traction::a_max(crtf, tire.growth, drag_force, weight);

            // Rotational-inertia reaction power
            hp_eng_pmi = vehicle.pmi.engine_flywheel_clutch * eng_rpm * (eng_rpm - rpm0);
            if hp_eng_pmi < 0.0 {
                hp_eng_pmi *= kp2;
            }
            hp_chas_pmi = chassis_pmi * dsrpm * (dsrpm - dsrpm0);
            if hp_chas_pmi < 0.0 {
                hp_chas_pmi = 0.0;
            }
            let work = (2.0 * PI / 60.0).powi(2) / (12.0 * HP_TO_FTLBPS * dt);
            hp_eng_pmi *= work;
            hp_chas_pmi *= work;

            // Power chain down to the contact patch
            gross_after_coupling = ar.mul(ar.sub(hp_save, hp_eng_pmi), clutch_slip);
            after_gears = ar.mul(gross_after_coupling, gear_eff * vehicle.overall_efficiency);
            after_tire_slip = ar.div(ar.sub(after_gears, hp_chas_pmi), tire_slip);
            hp_net = ar.sub(after_tire_slip, drag_hp);

            pqwt = ar.div(ar.mul(ar.mul(HP_TO_FTLBPS, GC), hp_net), weight);
            let mut ags_new = ar.div(pqwt, ar.mul(vel_use, GC));

            // Jerk limits against the previous step
            let jerk_iter = (ags_new - ags0) / dt;
            if jerk_iter < JMIN {
                ags_new = ags0 + JMIN * dt;
                pqwt = ags_new * GC * vel_use;
            } else if jerk_iter > JMAX {
                ags_new = ags0 + JMAX * dt;
                pqwt = ags_new * GC * vel_use;
            }

            // Traction ceiling: reflective in strict mode, flat otherwise
            if opts.strict {
                let clamped =
                    traction::clamp_acceleration(ags_new, pqwt, amax, a_min_eff, GC, vel_use);
                ags_new = clamped.ags_g;
                pqwt = clamped.pqwt;
                slipping = clamped.slipping;
            } else {
                let (applied, flag) =
                    traction::apply_traction_limit(ags_new * weight, amax * weight);
                slipping = flag;
                ags_new = applied / weight;
                if ags_new < a_min_eff {
                    ags_new = a_min_eff;
                }
                pqwt = ags_new * GC * vel_use;
            }

            let vel_new = ar.add(v0, ar.mul(ar.mul(ags_new, GC), dt)).max(0.0);
            let rel_pct = if vel_new != 0.0 {
                (100.0 * (vel_new - vel_est) / vel_new).abs()
            } else {
                0.0
            };
            ags = ags_new;

            if rel_pct <= CONVERGENCE_TOL_PCT {
                vel_est = vel_new;
                converged = true;
                break;
            }
            if k == CONVERGENCE_BUDGET {
                vel_est = vel_new;
                break;
            }

            // Relaxed update toward the new estimate
            let z = if hp_save != 0.0 {
                (hp_net / hp_save).clamp(K6, K61)
            } else {
                1.0
            };
            vel_est = ar.add(vel_est, ar.mul(z, ar.sub(vel_new, vel_est)));
            if vel_est < 0.0 {
                vel_est = 0.0;
            }
        }

        if !converged {
            overruns += 1;
            if overruns == 1 {
                warn!(step, t_s = t0, "convergence budget exhausted; using last iterate");
            }
        }

        // Integrate position with the legacy closed form; fall back to
        // the trapezoid when thrust is negligible or negative
        v = vel_est;
        let new_x = if pqwt > 0.1 {
            let term = 2.0 * pqwt * dt + v0 * v0;
            if term >= 0.0 {
                ar.add(
                    ar.div(ar.sub(term.powf(1.5), v0.powi(3)), 3.0 * pqwt),
                    x0,
                )
            } else {
                x0 + (v0 + v) / 2.0 * dt
            }
        } else {
            x0 + ((v0 + v) / 2.0 * dt).max(0.0)
        };
        x = new_x;
        t = t0 + dt;

        // Non-finite state aborts with the last good row attached
        for (quantity, value) in [("velocity", v), ("distance", x), ("rpm", eng_rpm)] {
            if !value.is_finite() {
                let last_good = rows.last().cloned().unwrap_or(TraceRow {
                    step: 0,
                    t_s: 0.0,
                    gear: 0,
                    rpm: launch_rpm,
                    v_fps: 0.0,
                    x_ft: 0.0,
                    ax_ftps2: 0.0,
                    hp: 0.0,
                    clutch_slip: None,
                    drag_hp: None,
                    roll_hp: None,
                    slipping: false,
                });
                return Err(SimError::NonFinite {
                    step,
                    quantity,
                    last_good: Box::new(last_good),
                });
            }
        }

        // Energy ledger (ft·lbf)
        {
            let e = HP_TO_FTLBPS * dt;
            energy.engine_input += hp_save * e;
            energy.engine_rotational += hp_eng_pmi * e;
            energy.chassis_rotational += hp_chas_pmi * e;
            let coupling_loss = (hp_save - hp_eng_pmi) - gross_after_coupling;
            let gear_loss = gross_after_coupling - after_gears;
            let slip_loss = (after_gears - hp_chas_pmi) - after_tire_slip;
            energy.driveline_loss += (coupling_loss + gear_loss + slip_loss) * e;
            energy.aero_drag_loss += aero_hp * e;
            energy.rolling_loss += roll_hp * e;
            let hp_eff = pqwt * weight / (HP_TO_FTLBPS * GC);
            energy.wheelspin_loss += (hp_net - hp_eff) * e;
        }

        // Shift state machine: trigger on the converged RPM; the gear
        // increments one tick after the trigger latches
        let trigger = !in_dwell
            && should_shift(gear, n_gears, eng_rpm, &vehicle.shift_rpm, opts.strict);
        let adv = advance(shift_state, trigger);
        shift_state = adv.state;
        if adv.execute {
            gear += 1;
            dwell_until = t + vehicle.coupling.dwell_s();
            debug!(step, gear, rpm = eng_rpm, t_s = t, "upshift");
        }

        rows.push(TraceRow {
            step,
            t_s: t,
            gear,
            rpm: eng_rpm,
            v_fps: v,
            x_ft: x,
            ax_ftps2: ags * GC,
            hp: hp_net,
            clutch_slip: Some(clutch_slip),
            drag_hp: Some(drag_hp),
            roll_hp: Some(roll_hp),
            slipping,
        });

        // Rollout clock: ET starts when the car clears the beams
        let timed_prev = timed_distance_ft(x0, rollout_in);
        let timed = timed_distance_ft(x, rollout_in);
        if rollout_clock.is_none() && timed > 0.0 {
            let rollout_ft = rollout_in / 12.0;
            let frac = if x > x0 {
                ((rollout_ft - x0) / (x - x0)).clamp(0.0, 1.0)
            } else {
                0.0
            };
            rollout_clock = Some(t0 + frac * (t - t0));
            debug!(t_s = rollout_clock.unwrap(), "rollout complete");
        }

        // Timeslip checkpoints, interpolated within the crossing step
        while let Some(&mark) = marks.peek() {
            if timed < mark {
                break;
            }
            let frac = if timed > timed_prev {
                ((mark - timed_prev) / (timed - timed_prev)).clamp(0.0, 1.0)
            } else {
                1.0
            };
            let t_at = t0 + frac * (t - t0);
            let v_at = v0 + frac * (v - v0);
            let clock = rollout_clock.unwrap_or(t_at);
            let cp = TimeslipCheckpoint {
                distance_ft: mark,
                time_s: t_at - clock,
                speed_mph: v_at * Z5,
            };
            debug!(distance_ft = mark, time_s = cp.time_s, mph = cp.speed_mph, "checkpoint");
            checkpoints.push(cp);
            marks.next();
            if mark >= race_len {
                et_s = cp.time_s;
                trap_mph = cp.speed_mph;
            }
        }

        if timed >= race_len {
            termination = Termination::Finished;
            break;
        }

        step += 1;
    }

    if overruns > 0 {
        warnings.push(format!(
            "convergence budget exhausted on {overruns} of {step} steps"
        ));
    }
    if termination != Termination::Finished {
        warnings.push(format!("run terminated early: {termination:?}"));
        et_s = t;
        trap_mph = v * Z5;
    }

    energy.final_kinetic = 0.5 * (weight / GC) * v * v;
    energy.residual = energy.engine_input
        - energy.aero_drag_loss
        - energy.rolling_loss
        - energy.driveline_loss
        - energy.engine_rotational
        - energy.chassis_rotational
        - energy.wheelspin_loss
        - energy.final_kinetic;

    let trace = Trace {
        name: MODEL_ID.to_string(),
        rows,
        et_s,
        mph: trap_mph,
    };

    Ok(RunResult {
        model: MODEL_ID,
        et_s,
        trap_mph,
        checkpoints,
        trace,
        termination,
        warnings,
        convergence_overruns: overruns,
        energy,
        steps: step,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::tests::{prostock_vehicle, track_env};

    fn run_quarter() -> RunResult {
        simulate(
            &prostock_vehicle(),
            &track_env(),
            RaceLength::Quarter,
            &SimOptions::default(),
        )
        .unwrap()
    }

    #[test]
    fn prostock_finishes_the_quarter() {
        let r = run_quarter();
        assert_eq!(r.termination, Termination::Finished);
        assert_eq!(r.checkpoints.len(), 5);
        assert!(r.et_s > 4.0 && r.et_s < 12.0, "ET {}", r.et_s);
        assert!(r.trap_mph > 140.0 && r.trap_mph < 260.0, "MPH {}", r.trap_mph);
    }

    #[test]
    fn checkpoints_strictly_increase() {
        let r = run_quarter();
        for pair in r.checkpoints.windows(2) {
            assert!(pair[1].time_s > pair[0].time_s);
            assert!(pair[1].speed_mph > pair[0].speed_mph);
        }
        let marks: Vec<f64> = r.checkpoints.iter().map(|c| c.distance_ft).collect();
        assert_eq!(marks, vec![60.0, 330.0, 660.0, 1000.0, 1320.0]);
    }

    #[test]
    fn runs_are_deterministic() {
        let a = run_quarter();
        let b = run_quarter();
        assert_eq!(a.et_s.to_bits(), b.et_s.to_bits());
        assert_eq!(a.trace.rows.len(), b.trace.rows.len());
        for (ra, rb) in a.trace.rows.iter().zip(b.trace.rows.iter()) {
            assert_eq!(ra.v_fps.to_bits(), rb.v_fps.to_bits());
            assert_eq!(ra.x_ft.to_bits(), rb.x_ft.to_bits());
        }
    }

    #[test]
    fn time_and_distance_monotone() {
        let r = run_quarter();
        for pair in r.trace.rows.windows(2) {
            assert!(pair[1].t_s > pair[0].t_s);
            assert!(pair[1].x_ft >= pair[0].x_ft);
        }
    }

    #[test]
    fn gears_never_decrease_and_stay_in_range() {
        let r = run_quarter();
        let n = prostock_vehicle().gear_count();
        let mut prev = 0;
        for row in &r.trace.rows {
            assert!(row.gear >= prev);
            assert!(row.gear < n);
            prev = row.gear;
        }
        // a ProStock pulls through all five gears in a quarter
        assert_eq!(prev, n - 1);
    }

    #[test]
    fn eighth_is_faster_than_quarter() {
        let eighth = simulate(
            &prostock_vehicle(),
            &track_env(),
            RaceLength::Eighth,
            &SimOptions::default(),
        )
        .unwrap();
        let quarter = run_quarter();
        assert!(eighth.et_s < quarter.et_s);
        assert!(eighth.trap_mph < quarter.trap_mph);
        assert_eq!(eighth.checkpoints.len(), 3);
    }

    #[test]
    fn energy_residual_is_small() {
        let r = run_quarter();
        assert!(r.energy.engine_input > 0.0);
        assert!(
            r.energy.residual_fraction() < 0.02,
            "residual fraction {}",
            r.energy.residual_fraction()
        );
    }

    #[test]
    fn worse_air_slows_the_car() {
        let mut env = track_env();
        env.temperature_f = 110.0;
        env.humidity_pct = 90.0;
        env.elevation_ft = 4000.0;
        let hot = simulate(
            &prostock_vehicle(),
            &env,
            RaceLength::Quarter,
            &SimOptions::default(),
        )
        .unwrap();
        let cool = run_quarter();
        assert!(hot.et_s > cool.et_s);
        assert!(hot.trap_mph < cool.trap_mph);
    }

    #[test]
    fn throttle_stop_slows_the_run() {
        let mut v = prostock_vehicle();
        v.throttle_stop = Some(crate::engine::ThrottleStop {
            activate_time_s: 1.5,
            duration_s: 1.0,
            throttle_pct: 50.0,
            ramp_time_s: 0.1,
        });
        let stopped = simulate(&v, &track_env(), RaceLength::Quarter, &SimOptions::default())
            .unwrap();
        let open = run_quarter();
        assert!(stopped.et_s > open.et_s + 0.05, "{} vs {}", stopped.et_s, open.et_s);
        assert!(stopped.trap_mph < open.trap_mph);
    }

    #[test]
    fn deep_staging_shortens_the_rollout() {
        let mut v = prostock_vehicle();
        v.deep_stage_in = 6.0;
        let deep = simulate(&v, &track_env(), RaceLength::Quarter, &SimOptions::default())
            .unwrap();
        let shallow = run_quarter();
        // Less free rollout distance: the ET clock starts earlier, so the
        // same physical run reads slower on the slip
        assert!(deep.et_s > shallow.et_s, "{} vs {}", deep.et_s, shallow.et_s);
    }

    #[test]
    fn step_budget_reports_nonfinished() {
        let opts = SimOptions {
            max_steps: 10,
            ..SimOptions::default()
        };
        let r = simulate(&prostock_vehicle(), &track_env(), RaceLength::Quarter, &opts).unwrap();
        assert_eq!(r.termination, Termination::StepBudgetExceeded);
        assert!(!r.warnings.is_empty());
    }

    #[test]
    fn validation_rejected_before_running() {
        let mut v = prostock_vehicle();
        v.shift_rpm.pop();
        let err = simulate(&v, &track_env(), RaceLength::Quarter, &SimOptions::default());
        assert!(matches!(err, Err(SimError::Validation { .. })));
    }
}
