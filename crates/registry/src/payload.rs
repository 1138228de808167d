//! Layering contract for definition payloads.

use serde_json::Value;

/// The behavior-bearing content of a definition.
///
/// The composer never inspects a payload; it only folds contributions bottom-up with
/// [`Payload::layer`], starting from a clone of the first contribution.
pub trait Payload: Clone + Send + Sync + 'static {
	/// Layers `upper` on top of `self`. Fields present in `upper` win.
	fn layer(&mut self, upper: &Self);
}

/// Objects merge key by key, recursively. Any other upper value (including `null`)
/// replaces the lower value.
impl Payload for Value {
	fn layer(&mut self, upper: &Self) {
		match (self, upper) {
			(Value::Object(lower), Value::Object(upper)) => {
				for (key, value) in upper {
					match lower.get_mut(key) {
						Some(existing) => existing.layer(value),
						None => {
							lower.insert(key.clone(), value.clone());
						}
					}
				}
			}
			(lower, upper) => *lower = upper.clone(),
		}
	}
}
