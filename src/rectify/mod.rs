pub mod homography;
pub mod perspective;

pub use homography::{TransformMatrix, solve_homography};
pub use perspective::{
    PerspectiveRectifier, RectificationPlan, destination_corners, order_points,
    target_dimensions,
};
