//! Shared test support: a small block codec with the same contract as a
//! real one.
//!
//! The codec frames its input into raw blocks (`len u16 LE`, then `len`
//! bytes) and run blocks (`len | 0x8000`, then the repeated byte), and ends
//! the logical stream with a zero-length header. A single step consumes at
//! most `max_step` bytes and emits at most one block, so the engine's
//! resumable loop and position bookkeeping get exercised on every transfer.
//! Higher compression levels allow longer run blocks, which makes redundant
//! data shrink more.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use streamcodec::{
    Codec, CodecSession, Direction, InputView, OutputView, Result, StatusCode, StreamCodecError,
};

const END_HEADER: u16 = 0;
const RUN_FLAG: u16 = 0x8000;
const MAX_BLOCK: usize = 0x7FFF;
const MIN_RUN: usize = 4;

const STATUS_STEP_FAILURE: i64 = -42;

/// Counters shared between a codec and the tests observing it.
#[derive(Default)]
pub struct MockStats {
    pub sessions_created: AtomicUsize,
    pub sessions_destroyed: AtomicUsize,
    pub compress_inits: AtomicUsize,
    pub decompress_inits: AtomicUsize,
    pub last_level: AtomicUsize,
    pub last_dictionary: Mutex<Option<Vec<u8>>>,
}

impl MockStats {
    pub fn live_sessions(&self) -> usize {
        self.sessions_created.load(Ordering::SeqCst)
            - self.sessions_destroyed.load(Ordering::SeqCst)
    }
}

/// Run-length block codec used as the external collaborator in tests.
pub struct RleCodec {
    block_size: usize,
    max_step: usize,
    fail_compress_after: Option<usize>,
    fail_decompress_after: Option<usize>,
    stall_compress: bool,
    stats: Arc<MockStats>,
}

impl RleCodec {
    pub fn new() -> Self {
        Self {
            block_size: 256,
            max_step: 61,
            fail_compress_after: None,
            fail_decompress_after: None,
            stall_compress: false,
            stats: Arc::new(MockStats::default()),
        }
    }

    /// Return a compress-step error once `steps` steps have run.
    pub fn fail_compress_after(mut self, steps: usize) -> Self {
        self.fail_compress_after = Some(steps);
        self
    }

    /// Return a decompress-step error once `steps` steps have run.
    pub fn fail_decompress_after(mut self, steps: usize) -> Self {
        self.fail_decompress_after = Some(steps);
        self
    }

    /// Make every compress step consume and produce nothing.
    pub fn stalling(mut self) -> Self {
        self.stall_compress = true;
        self
    }

    pub fn stats(&self) -> Arc<MockStats> {
        Arc::clone(&self.stats)
    }
}

impl Codec for RleCodec {
    fn name(&self) -> &str {
        "rle-mock"
    }

    fn create_compress_session(&self) -> Result<Box<dyn CodecSession>> {
        self.stats.sessions_created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(CompressSession {
            run_cap: MIN_RUN,
            max_step: self.max_step,
            fail_after: self.fail_compress_after,
            stall: self.stall_compress,
            steps: 0,
            ended: false,
            stats: Arc::clone(&self.stats),
        }))
    }

    fn create_decompress_session(&self) -> Result<Box<dyn CodecSession>> {
        self.stats.sessions_created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(DecompressSession {
            max_step: self.max_step,
            fail_after: self.fail_decompress_after,
            steps: 0,
            state: DecodeState::Header,
            header: [0; 2],
            header_len: 0,
            stats: Arc::clone(&self.stats),
        }))
    }

    fn recommended_input_size(&self, _direction: Direction) -> usize {
        self.block_size
    }

    fn recommended_output_size(&self, _direction: Direction) -> usize {
        self.block_size
    }

    fn max_compression_level(&self) -> i32 {
        9
    }

    fn status_is_error(&self, status: StatusCode) -> bool {
        status.raw() < 0
    }

    fn status_message(&self, status: StatusCode) -> String {
        match status.raw() {
            STATUS_STEP_FAILURE => "synthetic step failure".to_string(),
            other => format!("unknown status {other}"),
        }
    }
}

struct CompressSession {
    run_cap: usize,
    max_step: usize,
    fail_after: Option<usize>,
    stall: bool,
    steps: usize,
    ended: bool,
    stats: Arc<MockStats>,
}

impl Drop for CompressSession {
    fn drop(&mut self) {
        self.stats.sessions_destroyed.fetch_add(1, Ordering::SeqCst);
    }
}

impl CompressSession {
    fn count_step(&mut self) -> StatusCode {
        self.steps += 1;
        match self.fail_after {
            Some(limit) if self.steps > limit => StatusCode::new(STATUS_STEP_FAILURE),
            _ => StatusCode::OK,
        }
    }
}

impl CodecSession for CompressSession {
    fn init_compress(&mut self, level: i32, dictionary: Option<&[u8]>) -> StatusCode {
        // Re-initialization resets all state left over from a pooled reuse.
        self.run_cap = ((8usize) << level.clamp(0, 12)).min(MAX_BLOCK);
        self.steps = 0;
        self.ended = false;
        self.stats.compress_inits.fetch_add(1, Ordering::SeqCst);
        self.stats.last_level.store(level as usize, Ordering::SeqCst);
        *self.stats.last_dictionary.lock().unwrap() = dictionary.map(|d| d.to_vec());
        StatusCode::OK
    }

    fn init_decompress(&mut self, _dictionary: Option<&[u8]>) -> StatusCode {
        StatusCode::new(STATUS_STEP_FAILURE)
    }

    fn compress_step(
        &mut self,
        output: &mut OutputView<'_>,
        input: &mut InputView<'_>,
    ) -> StatusCode {
        let status = self.count_step();
        if status != StatusCode::OK {
            return status;
        }
        if self.stall {
            return StatusCode::OK;
        }
        let pending = input.remaining();
        if pending.is_empty() || output.remaining_len() < 3 {
            return StatusCode::OK;
        }

        let budget = pending.len().min(self.max_step);
        let value = pending[0];
        let run_len = pending[..budget.min(self.run_cap)]
            .iter()
            .take_while(|&&b| b == value)
            .count();

        if run_len >= MIN_RUN {
            let header = RUN_FLAG | run_len as u16;
            let out = output.remaining_mut();
            out[..2].copy_from_slice(&header.to_le_bytes());
            out[2] = value;
            output.advance(3);
            input.advance(run_len);
        } else {
            let n = budget.min(output.remaining_len() - 2).min(MAX_BLOCK);
            let out = output.remaining_mut();
            out[..2].copy_from_slice(&(n as u16).to_le_bytes());
            out[2..2 + n].copy_from_slice(&pending[..n]);
            output.advance(2 + n);
            input.advance(n);
        }
        StatusCode::OK
    }

    fn decompress_step(
        &mut self,
        _output: &mut OutputView<'_>,
        _input: &mut InputView<'_>,
    ) -> StatusCode {
        StatusCode::new(STATUS_STEP_FAILURE)
    }

    fn flush_step(&mut self, _output: &mut OutputView<'_>) -> StatusCode {
        // Nothing is buffered inside the session.
        self.count_step()
    }

    fn end_step(&mut self, output: &mut OutputView<'_>) -> StatusCode {
        let status = self.count_step();
        if status != StatusCode::OK {
            return status;
        }
        if !self.ended && output.remaining_len() >= 2 {
            output
                .remaining_mut()[..2]
                .copy_from_slice(&END_HEADER.to_le_bytes());
            output.advance(2);
            self.ended = true;
        }
        StatusCode::OK
    }
}

enum DecodeState {
    Header,
    Raw { left: usize },
    RunValue { len: usize },
    Run { value: u8, left: usize },
    Finished,
}

struct DecompressSession {
    max_step: usize,
    fail_after: Option<usize>,
    steps: usize,
    state: DecodeState,
    header: [u8; 2],
    header_len: usize,
    stats: Arc<MockStats>,
}

impl Drop for DecompressSession {
    fn drop(&mut self) {
        self.stats.sessions_destroyed.fetch_add(1, Ordering::SeqCst);
    }
}

impl CodecSession for DecompressSession {
    fn init_compress(&mut self, _level: i32, _dictionary: Option<&[u8]>) -> StatusCode {
        StatusCode::new(STATUS_STEP_FAILURE)
    }

    fn init_decompress(&mut self, dictionary: Option<&[u8]>) -> StatusCode {
        self.steps = 0;
        self.state = DecodeState::Header;
        self.header_len = 0;
        self.stats.decompress_inits.fetch_add(1, Ordering::SeqCst);
        *self.stats.last_dictionary.lock().unwrap() = dictionary.map(|d| d.to_vec());
        StatusCode::OK
    }

    fn compress_step(
        &mut self,
        _output: &mut OutputView<'_>,
        _input: &mut InputView<'_>,
    ) -> StatusCode {
        StatusCode::new(STATUS_STEP_FAILURE)
    }

    fn decompress_step(
        &mut self,
        output: &mut OutputView<'_>,
        input: &mut InputView<'_>,
    ) -> StatusCode {
        self.steps += 1;
        if let Some(limit) = self.fail_after {
            if self.steps > limit {
                return StatusCode::new(STATUS_STEP_FAILURE);
            }
        }

        let mut produced = 0;
        loop {
            match self.state {
                DecodeState::Finished => {
                    // Ignore any trailing bytes after the end marker.
                    let trailing = input.remaining().len();
                    input.advance(trailing);
                    return StatusCode::OK;
                }
                DecodeState::Header => {
                    while self.header_len < 2 && !input.remaining().is_empty() {
                        self.header[self.header_len] = input.remaining()[0];
                        self.header_len += 1;
                        input.advance(1);
                    }
                    if self.header_len < 2 {
                        return StatusCode::OK;
                    }
                    self.header_len = 0;
                    let header = u16::from_le_bytes(self.header);
                    self.state = if header == END_HEADER {
                        DecodeState::Finished
                    } else if header & RUN_FLAG != 0 {
                        DecodeState::RunValue {
                            len: (header & !RUN_FLAG) as usize,
                        }
                    } else {
                        DecodeState::Raw {
                            left: header as usize,
                        }
                    };
                }
                DecodeState::RunValue { len } => {
                    if input.remaining().is_empty() {
                        return StatusCode::OK;
                    }
                    let value = input.remaining()[0];
                    input.advance(1);
                    self.state = DecodeState::Run { value, left: len };
                }
                DecodeState::Raw { left } => {
                    let n = left
                        .min(input.remaining().len())
                        .min(output.remaining_len())
                        .min(self.max_step - produced.min(self.max_step));
                    if n == 0 {
                        return StatusCode::OK;
                    }
                    output.remaining_mut()[..n].copy_from_slice(&input.remaining()[..n]);
                    output.advance(n);
                    input.advance(n);
                    produced += n;
                    self.state = if left == n {
                        DecodeState::Header
                    } else {
                        DecodeState::Raw { left: left - n }
                    };
                }
                DecodeState::Run { value, left } => {
                    let n = left
                        .min(output.remaining_len())
                        .min(self.max_step - produced.min(self.max_step));
                    if n == 0 {
                        return StatusCode::OK;
                    }
                    for slot in &mut output.remaining_mut()[..n] {
                        *slot = value;
                    }
                    output.advance(n);
                    produced += n;
                    self.state = if left == n {
                        DecodeState::Header
                    } else {
                        DecodeState::Run {
                            value,
                            left: left - n,
                        }
                    };
                }
            }
        }
    }

    fn flush_step(&mut self, _output: &mut OutputView<'_>) -> StatusCode {
        StatusCode::new(STATUS_STEP_FAILURE)
    }

    fn end_step(&mut self, _output: &mut OutputView<'_>) -> StatusCode {
        StatusCode::new(STATUS_STEP_FAILURE)
    }
}

/// Fresh codec as the trait object the streams expect.
pub fn codec() -> Arc<dyn Codec> {
    Arc::new(RleCodec::new())
}

/// Pseudo-random data with embedded runs, deterministic per seed.
pub fn redundant_data(size: usize, seed: u64) -> Vec<u8> {
    let mut state = seed | 1;
    let mut data = Vec::with_capacity(size);
    while data.len() < size {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        let byte = (state >> 33) as u8;
        if state % 5 == 0 {
            let run = 4 + (state >> 40) as usize % 200;
            data.extend(std::iter::repeat(byte).take(run));
        } else {
            data.push(byte);
        }
    }
    data.truncate(size);
    data
}

/// Extract the crate error from an `io::Error` produced by the stream's
/// `Read`/`Write` impls.
pub fn as_codec_error(err: &std::io::Error) -> Option<&StreamCodecError> {
    err.get_ref()?.downcast_ref::<StreamCodecError>()
}
