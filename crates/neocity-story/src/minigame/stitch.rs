//! Wave stitch (`audio_stitch`)
//!
//! Five wave segments start shuffled. Selecting one segment and then another
//! swaps them; selecting the same segment twice clears the selection.

use rand::seq::SliceRandom;

use super::{MinigameInput, MinigameTask, TaskStatus};

pub const SEGMENTS: usize = 5;

#[derive(Debug, Clone)]
pub struct WaveStitch {
    /// `order[pos]` is the segment currently at `pos`
    order: Vec<usize>,
    selected: Option<usize>,
}

impl WaveStitch {
    /// Shuffled segments, never already in order
    pub fn new() -> Self {
        let mut order: Vec<usize> = (0..SEGMENTS).collect();
        let mut rng = rand::thread_rng();
        while is_sorted(&order) {
            order.shuffle(&mut rng);
        }
        Self::with_order(order)
    }

    pub fn with_order(order: Vec<usize>) -> Self {
        Self { order, selected: None }
    }

    pub fn order(&self) -> &[usize] {
        &self.order
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }
}

impl Default for WaveStitch {
    fn default() -> Self {
        Self::new()
    }
}

fn is_sorted(order: &[usize]) -> bool {
    order.iter().enumerate().all(|(i, &v)| i == v)
}

impl MinigameTask for WaveStitch {
    fn kind(&self) -> &str {
        "audio_stitch"
    }

    fn handle(&mut self, input: &MinigameInput) -> TaskStatus {
        if self.status() == TaskStatus::Completed {
            return TaskStatus::Completed;
        }
        if let MinigameInput::Select(pos) = *input {
            if pos >= self.order.len() {
                return self.status();
            }
            match self.selected.take() {
                None => self.selected = Some(pos),
                Some(first) if first == pos => {}
                Some(first) => self.order.swap(first, pos),
            }
        }
        self.status()
    }

    fn status(&self) -> TaskStatus {
        if is_sorted(&self.order) {
            TaskStatus::Completed
        } else {
            TaskStatus::Running
        }
    }

    fn status_line(&self) -> String {
        if self.status() == TaskStatus::Completed {
            return "Audio Restored!".to_string();
        }
        self.order
            .iter()
            .enumerate()
            .map(|(pos, seg)| {
                if self.selected == Some(pos) {
                    format!("[{}]", seg)
                } else {
                    format!(" {} ", seg)
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_is_a_shuffled_permutation() {
        for _ in 0..20 {
            let task = WaveStitch::new();
            let mut sorted = task.order().to_vec();
            sorted.sort_unstable();
            assert_eq!(sorted, vec![0, 1, 2, 3, 4]);
            assert_eq!(task.status(), TaskStatus::Running);
        }
    }

    #[test]
    fn selecting_twice_deselects() {
        let mut task = WaveStitch::with_order(vec![1, 0, 2, 3, 4]);
        task.handle(&MinigameInput::Select(0));
        assert_eq!(task.selected(), Some(0));
        assert_eq!(task.status_line(), "[1] 0  2  3  4 ");
        task.handle(&MinigameInput::Select(0));
        assert_eq!(task.selected(), None);
        assert_eq!(task.order(), &[1, 0, 2, 3, 4]);
    }

    #[test]
    fn swaps_until_identity() {
        let mut task = WaveStitch::with_order(vec![2, 0, 1, 3, 4]);
        task.handle(&MinigameInput::Select(0));
        assert_eq!(task.handle(&MinigameInput::Select(2)), TaskStatus::Running);
        assert_eq!(task.order(), &[1, 0, 2, 3, 4]);
        task.handle(&MinigameInput::Select(1));
        assert_eq!(task.handle(&MinigameInput::Select(0)), TaskStatus::Completed);
        assert_eq!(task.status_line(), "Audio Restored!");
    }

    #[test]
    fn out_of_range_select_is_ignored() {
        let mut task = WaveStitch::with_order(vec![1, 0, 2, 3, 4]);
        task.handle(&MinigameInput::Select(9));
        assert_eq!(task.selected(), None);
        task.handle(&MinigameInput::Move);
        assert_eq!(task.status(), TaskStatus::Running);
    }
}
