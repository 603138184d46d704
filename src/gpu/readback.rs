//! Double-buffered async readback of the speed histogram
//!
//! Two host-visible staging buffers alternate so the copy for frame N can be
//! in flight while the host is still waiting on frame N-1. A slot is busy from
//! the moment its copy is submitted until its contents are consumed; when both
//! are busy the frame's copy is skipped and the caller keeps its stale value.

use std::sync::mpsc;

use tracing::trace;

use crate::histogram::NUM_BINS;

/// Size of the histogram buffer in bytes
pub const HISTOGRAM_BYTES: u64 = (NUM_BINS * std::mem::size_of::<u32>()) as u64;

#[derive(Debug, PartialEq)]
enum ReadyState {
    Ready,
    Pending,
    Failed,
}

/// A single staging buffer with async map tracking
struct StagingSlot {
    buffer: wgpu::Buffer,
    rx: Option<mpsc::Receiver<Result<(), wgpu::BufferAsyncError>>>,
    /// Frame whose histogram is in this slot, while busy
    frame: Option<u64>,
}

impl StagingSlot {
    fn new(device: &wgpu::Device, label: &str) -> Self {
        Self {
            buffer: device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size: HISTOGRAM_BYTES,
                usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            }),
            rx: None,
            frame: None,
        }
    }

    fn is_busy(&self) -> bool {
        self.frame.is_some()
    }

    fn start_map(&mut self) {
        let (tx, rx) = mpsc::channel();
        self.buffer
            .slice(..)
            .map_async(wgpu::MapMode::Read, move |result| {
                let _ = tx.send(result);
            });
        self.rx = Some(rx);
    }

    fn check_ready(&mut self) -> ReadyState {
        let Some(receiver) = &self.rx else {
            return ReadyState::Pending;
        };
        match receiver.try_recv() {
            Ok(Ok(())) => {
                self.rx = None;
                ReadyState::Ready
            }
            Ok(Err(_)) | Err(mpsc::TryRecvError::Disconnected) => {
                self.rx = None;
                ReadyState::Failed
            }
            Err(mpsc::TryRecvError::Empty) => ReadyState::Pending,
        }
    }

    /// Copy the mapped counts out and release the slot
    fn consume(&mut self) -> [u32; NUM_BINS] {
        let mut counts = [0u32; NUM_BINS];
        {
            let data = self.buffer.slice(..).get_mapped_range();
            counts.copy_from_slice(bytemuck::cast_slice(&data));
        }
        self.buffer.unmap();
        self.frame = None;
        counts
    }

    fn release_failed(&mut self) {
        self.frame = None;
    }
}

/// Two alternating staging slots for the histogram
pub struct HistogramReadback {
    slots: [StagingSlot; 2],
    next: usize,
    skipped: u64,
}

impl HistogramReadback {
    pub fn new(device: &wgpu::Device) -> Self {
        Self {
            slots: [
                StagingSlot::new(device, "Histogram Readback A"),
                StagingSlot::new(device, "Histogram Readback B"),
            ],
            next: 0,
            skipped: 0,
        }
    }

    /// Submit a copy of `source` into a free slot.
    ///
    /// Returns false, without submitting anything, if both slots are busy.
    pub fn schedule(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        source: &wgpu::Buffer,
        frame: u64,
    ) -> bool {
        let index = if !self.slots[self.next].is_busy() {
            self.next
        } else if !self.slots[1 - self.next].is_busy() {
            1 - self.next
        } else {
            self.skipped += 1;
            trace!(frame, "histogram readback skipped, both slots busy");
            return false;
        };

        let slot = &mut self.slots[index];
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Histogram Readback Encoder"),
        });
        encoder.copy_buffer_to_buffer(source, 0, &slot.buffer, 0, HISTOGRAM_BYTES);
        queue.submit(std::iter::once(encoder.finish()));

        slot.frame = Some(frame);
        slot.start_map();
        self.next = 1 - index;
        true
    }

    /// Poll without blocking and return the newest completed histogram.
    ///
    /// Every completed slot is released; older ones are dropped in favour of
    /// the newest.
    pub fn poll(&mut self, device: &wgpu::Device) -> Option<[u32; NUM_BINS]> {
        let _ = device.poll(wgpu::Maintain::Poll);

        let mut newest: Option<(u64, [u32; NUM_BINS])> = None;
        for slot in &mut self.slots {
            let Some(frame) = slot.frame else {
                continue;
            };
            match slot.check_ready() {
                ReadyState::Ready => {
                    let counts = slot.consume();
                    if newest.is_none_or(|(f, _)| frame > f) {
                        newest = Some((frame, counts));
                    }
                }
                ReadyState::Failed => {
                    trace!(frame, "histogram readback map failed");
                    slot.release_failed();
                }
                ReadyState::Pending => {}
            }
        }
        newest.map(|(_, counts)| counts)
    }

    /// Block until every in-flight slot resolves, then return the newest
    pub fn wait(&mut self, device: &wgpu::Device) -> Option<[u32; NUM_BINS]> {
        let _ = device.poll(wgpu::Maintain::Wait);
        self.poll(device)
    }

    /// Number of slots currently holding an unconsumed copy
    pub fn busy_slots(&self) -> usize {
        self.slots.iter().filter(|s| s.is_busy()).count()
    }

    /// Frames whose copy was skipped because both slots were busy
    pub fn skipped(&self) -> u64 {
        self.skipped
    }
}
