//! CPA/TCPA Calculation
//!
//! Computes Closest Point of Approach (CPA) and Time to CPA (TCPA) between
//! own ship and an AIS contact, assuming both hold course and speed.

use nalgebra::Vector2;
use serde::Serialize;

use crate::error::CpaError;

/// Speeds at or below this (m/s) count as stationary
pub const MIN_SPEED_MS: f64 = 0.01;

/// Squared relative speed ((m/s)²) below which the vessels never converge
pub const MIN_RELATIVE_SPEED_SQ: f64 = 1e-4;

/// Course and speed of one vessel
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Kinematics {
    /// Course over ground in degrees true
    pub course: Option<f64>,
    /// Speed over ground in m/s, absent counts as 0
    pub speed: Option<f64>,
}

impl Kinematics {
    pub fn new(course: Option<f64>, speed: Option<f64>) -> Self {
        Kinematics { course, speed }
    }

    pub fn stationary() -> Self {
        Kinematics::default()
    }

    fn is_moving(&self) -> bool {
        self.speed.unwrap_or(0.0) > MIN_SPEED_MS
    }
}

/// Everything the engine needs for one contact
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CpaInput {
    /// Bearing from own ship to the contact in degrees
    pub bearing: f64,
    /// Distance from own ship to the contact in meters
    pub distance: f64,
    pub own: Kinematics,
    pub target: Kinematics,
}

/// Result of CPA/TCPA calculation
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CpaResult {
    /// Closest Point of Approach in meters
    pub cpa: f64,
    /// Time to Closest Point of Approach in seconds.
    /// 0 when the contact is already opening, infinite when it never converges.
    pub tcpa: f64,
}

/// Velocity as an (east, north) vector in m/s
fn velocity(course_deg: f64, speed: f64) -> Vector2<f64> {
    let course = course_deg.to_radians();
    Vector2::new(speed * course.sin(), speed * course.cos())
}

/// Calculate CPA and TCPA between own ship and a contact
///
/// Uses relative velocity method:
/// 1. Place own ship at the origin, the contact at its bearing/distance
/// 2. Compute relative velocity (contact - own ship)
/// 3. Find the time when the separation is minimal
///
/// # Errors
///
/// [`CpaError::UndeterminedOwnCourse`] when own ship is moving without a
/// known course. A contact without course is treated as stationary instead;
/// the asymmetry is deliberate.
pub fn calculate_cpa_tcpa(input: &CpaInput) -> Result<CpaResult, CpaError> {
    let own_velocity = if input.own.is_moving() {
        let course = input.own.course.ok_or(CpaError::UndeterminedOwnCourse)?;
        velocity(course, input.own.speed.unwrap_or(0.0))
    } else {
        Vector2::zeros()
    };

    let target_velocity = match input.target.course {
        Some(course) if input.target.is_moving() => {
            velocity(course, input.target.speed.unwrap_or(0.0))
        }
        _ => Vector2::zeros(),
    };

    let rel_velocity = target_velocity - own_velocity;
    let v_sq = rel_velocity.norm_squared();

    // Same course and speed, or both stopped
    if v_sq < MIN_RELATIVE_SPEED_SQ {
        return Ok(CpaResult {
            cpa: input.distance,
            tcpa: f64::INFINITY,
        });
    }

    let rel_position = velocity(input.bearing, input.distance);

    // TCPA = -(r · v) / |v|²
    let tcpa = -rel_position.dot(&rel_velocity) / v_sq;

    if tcpa <= 0.0 {
        // Closest approach is now or behind us; the contact is opening
        return Ok(CpaResult {
            cpa: input.distance,
            tcpa: 0.0,
        });
    }

    let cpa = (rel_position + rel_velocity * tcpa).norm();

    Ok(CpaResult { cpa, tcpa })
}
