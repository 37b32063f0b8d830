//! 메모리 프레임 소스

use std::collections::VecDeque;

use lanwarden_core::error::CaptureError;

use super::{FramePoll, FrameSource, RawFrame};

/// 준비된 프레임 목록을 순서대로 재생합니다.
///
/// `fail_after`를 지정하면 해당 개수의 프레임을 내보낸 뒤 에러를 반환합니다.
#[derive(Debug, Default)]
pub struct MemoryFrameSource {
    frames: VecDeque<RawFrame>,
    fault: Option<(usize, CaptureError)>,
    emitted: usize,
}

impl MemoryFrameSource {
    pub fn new(frames: impl IntoIterator<Item = RawFrame>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
            fault: None,
            emitted: 0,
        }
    }

    /// `count`개의 프레임 이후 `error`로 실패하도록 설정합니다.
    pub fn fail_after(mut self, count: usize, error: CaptureError) -> Self {
        self.fault = Some((count, error));
        self
    }

    /// 남은 프레임 수
    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl FrameSource for MemoryFrameSource {
    fn poll_frame(&mut self) -> Result<FramePoll, CaptureError> {
        if let Some((count, error)) = &self.fault {
            if self.emitted >= *count {
                return Err(error.clone());
            }
        }

        match self.frames.pop_front() {
            Some(frame) => {
                self.emitted += 1;
                Ok(FramePoll::Frame(frame))
            }
            None => Ok(FramePoll::Exhausted),
        }
    }

    fn describe(&self) -> String {
        format!("memory ({} frames)", self.frames.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replays_in_order_then_exhausts() {
        let mut src = MemoryFrameSource::new([RawFrame::new(vec![1u8]), RawFrame::new(vec![2u8])]);
        assert!(matches!(src.poll_frame().unwrap(), FramePoll::Frame(f) if f.data[..] == [1]));
        assert!(matches!(src.poll_frame().unwrap(), FramePoll::Frame(f) if f.data[..] == [2]));
        assert_eq!(src.poll_frame().unwrap(), FramePoll::Exhausted);
        assert_eq!(src.poll_frame().unwrap(), FramePoll::Exhausted);
    }

    #[test]
    fn injected_fault_after_count() {
        let mut src = MemoryFrameSource::new([RawFrame::new(vec![1u8]), RawFrame::new(vec![2u8])])
            .fail_after(1, CaptureError::Read("link down".to_owned()));
        assert!(matches!(src.poll_frame().unwrap(), FramePoll::Frame(_)));
        assert!(matches!(src.poll_frame(), Err(CaptureError::Read(_))));
        assert_eq!(src.remaining(), 1);
    }
}
