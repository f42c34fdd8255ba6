// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Workflow coordination only: no tensor math, no printing,
// no direct file formats. Each use case tells the data, ml
// and infra layers what to do, in order.

// The grid loop shared by every search
pub mod grid_search;

// Validate → load → search → save
pub mod search_use_case;

// Reload the best model and classify one image
pub mod predict_use_case;
