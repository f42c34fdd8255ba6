// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types describing the search:
//
//   hyperparams.rs — the (batch size × learning rate) grid and
//                    the ±10% range heuristic
//   trial.rs       — per-trial results and the search outcome
//   sample.rs      — a decoded image with its label
//   traits.rs      — ImageSource / TrialRunner seams
//
// No Burn types and no file I/O in this layer.

pub mod hyperparams;

pub mod sample;

pub mod trial;

pub mod traits;
