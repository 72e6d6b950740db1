/// Decide whether a trained model should be deployed: its r2 score must strictly exceed the configured minimum. A score exactly at the minimum does not deploy.
pub fn deployment_trigger(r2: f32, min_accuracy: f32) -> bool {
	r2 > min_accuracy
}
