/// Factor rescaling a busy percentage measured over `actual` to the `requested` window
///
/// A run cut short (by a watchdog, say) measures a different window than the
/// caller intended. The factor assumes utilization scales linearly with the
/// window. A zero `requested` means no target and yields 1.0.
pub fn correction_factor(requested: f64, actual: f64) -> f64 {
	if requested == 0.0 {
		1.0
	} else {
		1.0 + (actual - requested) / requested
	}
}

/// Applies [`correction_factor`] to a measured busy percentage
///
/// The result is not clamped: values outside 0..=100 flag a measurement
/// anomaly the caller should surface.
pub fn correct(measured_busy_pct: f64, requested: f64, actual: f64) -> f64 {
	measured_busy_pct * correction_factor(requested, actual)
}
