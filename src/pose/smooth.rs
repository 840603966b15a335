use std::collections::VecDeque;

use super::geometry::moving_average;
use super::{LandmarkId, PoseFrame};

/// Moving-average filter over landmark coordinates.
///
/// Each landmark is averaged over the frames in which it was present; a
/// landmark missing from the incoming frame stays missing in the output so
/// incompleteness is never hidden from the validator.
pub struct LandmarkSmoother {
    window: usize,
    history: VecDeque<PoseFrame>,
}

impl LandmarkSmoother {
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            window,
            history: VecDeque::with_capacity(window),
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn apply(&mut self, frame: PoseFrame) -> PoseFrame {
        if self.window == 1 {
            return frame;
        }

        self.history.push_back(frame.clone());
        if self.history.len() > self.window {
            self.history.pop_front();
        }

        let mut smoothed = frame;
        for id in LandmarkId::ALL {
            let Some(current) = smoothed.get(id) else {
                continue;
            };

            let samples: Vec<_> = self.history.iter().filter_map(|f| f.get(id)).collect();
            let xs: Vec<f32> = samples.iter().map(|l| l.x).collect();
            let ys: Vec<f32> = samples.iter().map(|l| l.y).collect();
            let zs: Vec<f32> = samples.iter().map(|l| l.z).collect();

            let mut averaged = current;
            averaged.x = moving_average(&xs, self.window);
            averaged.y = moving_average(&ys, self.window);
            averaged.z = moving_average(&zs, self.window);
            smoothed.landmarks[id.index()] = Some(averaged);
        }

        smoothed
    }

    pub fn reset(&mut self) {
        self.history.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::Landmark;

    fn frame_with_wrist_x(sequence: u64, x: f32) -> PoseFrame {
        PoseFrame::from_points(
            sequence,
            sequence * 33,
            [(LandmarkId::LeftWrist, Landmark::new(x, 0.5, 0.0, 1.0))],
        )
    }

    #[test]
    fn window_of_one_passes_frames_through() {
        let mut smoother = LandmarkSmoother::new(1);
        let frame = frame_with_wrist_x(1, 0.7);
        assert_eq!(smoother.apply(frame.clone()), frame);
    }

    #[test]
    fn averages_over_trailing_frames() {
        let mut smoother = LandmarkSmoother::new(3);
        smoother.apply(frame_with_wrist_x(1, 0.1));
        smoother.apply(frame_with_wrist_x(2, 0.2));
        smoother.apply(frame_with_wrist_x(3, 0.3));
        let out = smoother.apply(frame_with_wrist_x(4, 0.4));

        let wrist = out.get(LandmarkId::LeftWrist).unwrap();
        assert!((wrist.x - 0.3).abs() < 1e-6);
        assert_eq!(out.sequence, 4);
    }

    #[test]
    fn missing_landmarks_stay_missing() {
        let mut smoother = LandmarkSmoother::new(3);
        smoother.apply(frame_with_wrist_x(1, 0.1));
        let out = smoother.apply(PoseFrame::from_points(2, 66, std::iter::empty()));
        assert!(out.get(LandmarkId::LeftWrist).is_none());
    }
}
