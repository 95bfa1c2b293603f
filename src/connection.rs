//! Connection state machine.
//!
//! Owns one logical ADB connection and advances it one event at a time:
//! the caller feeds in raw transport bytes via [`Connection::ingest`] and
//! writes out whatever frames the machine emits. The machine itself never
//! performs I/O, which keeps every transition testable without a socket.
//!
//! ```text
//! Idle ──start──► AwaitingConnAck ──CNXN──► StreamOpening ──OKAY/WRTE──►
//! StreamOpen ──CLSE──► Closed            (any failure ──► Failed)
//! ```
//!
//! One connection runs one shell command. `start` from any state other
//! than `Idle` is rejected with [`AdbError::Busy`]; requests are never
//! queued or interleaved.

use bytes::{Bytes, BytesMut};

use crate::error::{AdbError, Result};
use crate::protocol::{build_frame, Command, Frame, FrameBuffer, MAX_PAYLOAD, PROTOCOL_VERSION};

/// Stream id this client assigns to its single shell stream.
pub const LOCAL_STREAM_ID: u32 = 2;

/// Connection lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// No connection in progress.
    Idle,
    /// CNXN sent, waiting for the server's CNXN.
    AwaitingConnAck,
    /// OPEN sent, waiting for the first OKAY or CLSE.
    StreamOpening,
    /// Stream established, receiving WRTE chunks.
    StreamOpen,
    /// Terminal: stream closed, response is final.
    Closed,
    /// Terminal: the connection failed.
    Failed,
}

impl State {
    /// Whether the state is terminal.
    pub fn is_terminal(self) -> bool {
        matches!(self, State::Closed | State::Failed)
    }

    fn name(self) -> &'static str {
        match self {
            State::Idle => "idle",
            State::AwaitingConnAck => "awaiting connection ack",
            State::StreamOpening => "opening stream",
            State::StreamOpen => "stream open",
            State::Closed => "closed",
            State::Failed => "failed",
        }
    }
}

/// Result of one [`Connection::ingest`] call.
#[derive(Debug)]
pub struct Ingest {
    /// Frames to write to the transport, in order.
    pub outgoing: Vec<Bytes>,
    /// True once the stream closed normally and the output is final.
    pub done: bool,
}

/// One logical ADB connection: state, reassembly buffer and the shell
/// output collected so far.
pub struct Connection {
    state: State,
    buffer: FrameBuffer,
    response: BytesMut,
    /// CNXN payload, `host::<device-name>`.
    identity: String,
    /// Shell command for the OPEN payload, captured at `start`.
    command_text: String,
    /// Server connection id from its CNXN arg0, echoed in OPEN arg1.
    remote_conn_id: u32,
    /// Remote stream id learned from OKAY/WRTE arg0.
    remote_stream_id: u32,
}

impl Connection {
    /// Create an idle connection identifying as `host::<device_name>`.
    pub fn new(device_name: &str) -> Self {
        Self::with_max_inbound_payload(device_name, crate::protocol::DEFAULT_MAX_INBOUND_PAYLOAD)
    }

    /// Create an idle connection with a custom inbound payload cap.
    pub fn with_max_inbound_payload(device_name: &str, max_payload: u32) -> Self {
        Self {
            state: State::Idle,
            buffer: FrameBuffer::with_max_payload(max_payload),
            response: BytesMut::new(),
            identity: format!("host::{}", device_name),
            command_text: String::new(),
            remote_conn_id: 0,
            remote_stream_id: 0,
        }
    }

    /// Current state.
    pub fn state(&self) -> State {
        self.state
    }

    /// Begin a shell exchange, returning the CNXN greeting to send.
    ///
    /// Only valid from `Idle`; any other state yields [`AdbError::Busy`]
    /// and leaves the connection untouched. The caller must write the
    /// returned frame only after the transport reports it is connected.
    pub fn start(&mut self, command_text: &str) -> Result<Bytes> {
        if self.state != State::Idle {
            return Err(AdbError::Busy);
        }

        self.buffer.clear();
        self.response.clear();
        self.command_text = command_text.to_string();
        self.remote_conn_id = 0;
        self.remote_stream_id = 0;
        self.state = State::AwaitingConnAck;

        tracing::debug!("starting shell exchange for {:?}", command_text);
        Ok(build_frame(
            Command::Cnxn,
            PROTOCOL_VERSION,
            MAX_PAYLOAD,
            self.identity.as_bytes(),
        )
        .into())
    }

    /// Feed transport bytes into the connection.
    ///
    /// Appends the bytes to the reassembly buffer, then applies one
    /// transition per complete frame until the buffer runs dry or a
    /// terminal state is reached — servers batch multiple frames into one
    /// delivery, and every complete frame must be drained before
    /// returning. Leftover partial-frame bytes are retained for the next
    /// call.
    pub fn ingest(&mut self, data: &[u8]) -> Result<Ingest> {
        if self.state == State::Idle {
            return Err(AdbError::Protocol(
                "ingest with no connection in progress".to_string(),
            ));
        }

        self.buffer.extend(data);
        let mut outgoing = Vec::new();

        while !self.state.is_terminal() {
            let frame = match self.buffer.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(e) => {
                    self.state = State::Failed;
                    return Err(e);
                }
            };
            self.apply(frame, &mut outgoing)?;
        }

        Ok(Ingest {
            outgoing,
            done: self.state == State::Closed,
        })
    }

    /// Apply a single received frame to the current state.
    fn apply(&mut self, frame: Frame, outgoing: &mut Vec<Bytes>) -> Result<()> {
        tracing::debug!(
            "received {} (arg0={:#x}, arg1={:#x}, {} payload bytes) while {}",
            frame.command(),
            frame.arg0(),
            frame.arg1(),
            frame.payload_len(),
            self.state.name()
        );

        match self.state {
            State::AwaitingConnAck => match frame.command() {
                Command::Cnxn => {
                    self.remote_conn_id = frame.arg0();
                    // Trailing space and NUL terminator are part of the
                    // shell request format; the server expects them.
                    let request = format!("shell: {} \0", self.command_text);
                    outgoing.push(
                        build_frame(
                            Command::Open,
                            LOCAL_STREAM_ID,
                            self.remote_conn_id,
                            request.as_bytes(),
                        )
                        .into(),
                    );
                    self.state = State::StreamOpening;
                    Ok(())
                }
                // AUTH lands here: unauthenticated servers only
                command => self.violation(command),
            },

            State::StreamOpening => match frame.command() {
                Command::Okay => {
                    self.remote_stream_id = frame.arg0();
                    self.state = State::StreamOpen;
                    Ok(())
                }
                Command::Clse => {
                    // Server rejected the open; result is empty
                    self.close_stream(frame.arg0(), outgoing);
                    Ok(())
                }
                Command::Wrte => {
                    // Pipelined data before the OKAY: take it as implicit
                    // readiness
                    self.remote_stream_id = frame.arg0();
                    self.state = State::StreamOpen;
                    self.accept_chunk(&frame, outgoing);
                    Ok(())
                }
                command => self.violation(command),
            },

            State::StreamOpen => match frame.command() {
                Command::Wrte => {
                    self.accept_chunk(&frame, outgoing);
                    Ok(())
                }
                Command::Clse => {
                    self.close_stream(frame.arg0(), outgoing);
                    Ok(())
                }
                command => {
                    // Benign extra OKAYs and the like
                    tracing::warn!("ignoring {} on open stream", command);
                    Ok(())
                }
            },

            // ingest() never applies frames in these states
            State::Idle | State::Closed | State::Failed => Ok(()),
        }
    }

    /// Append a WRTE payload and acknowledge it, or the server stalls.
    fn accept_chunk(&mut self, frame: &Frame, outgoing: &mut Vec<Bytes>) {
        self.response.extend_from_slice(frame.payload());
        outgoing.push(build_frame(Command::Okay, LOCAL_STREAM_ID, frame.arg0(), &[]).into());
    }

    /// Echo the server's CLSE and finish.
    fn close_stream(&mut self, remote_id: u32, outgoing: &mut Vec<Bytes>) {
        outgoing.push(build_frame(Command::Clse, LOCAL_STREAM_ID, remote_id, &[]).into());
        self.state = State::Closed;
        tracing::debug!("stream closed with {} bytes of output", self.response.len());
    }

    fn violation(&mut self, command: Command) -> Result<()> {
        let state = self.state.name();
        self.state = State::Failed;
        Err(AdbError::UnexpectedCommand { command, state })
    }

    /// Handle a transport-level disconnect.
    ///
    /// In a terminal state this is a no-op. Otherwise the connection
    /// fails with [`AdbError::Disconnected`] carrying whatever output was
    /// collected, so the caller can decide whether the partial result is
    /// usable.
    pub fn on_disconnected(&mut self) -> Result<()> {
        if self.state.is_terminal() {
            return Ok(());
        }
        self.state = State::Failed;
        Err(AdbError::Disconnected {
            partial: self.response.to_vec(),
        })
    }

    /// Mark the connection failed without producing an error of its own.
    ///
    /// Used by the driver when the failure originates outside the state
    /// machine (timeout, write error).
    pub fn abort(&mut self) {
        if !self.state.is_terminal() {
            self.state = State::Failed;
        }
    }

    /// Take the accumulated shell output as text.
    ///
    /// Shell output is nominally UTF-8/ASCII; invalid sequences are
    /// replaced rather than failing an otherwise complete exchange.
    pub fn take_output(&mut self) -> String {
        let bytes = self.response.split();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    /// Reset to `Idle`, clearing all buffers.
    ///
    /// Called after every terminal transition, once the transport has
    /// been released, so a subsequent `start` can proceed.
    pub fn reset(&mut self) {
        self.state = State::Idle;
        self.buffer.clear();
        self.response.clear();
        self.command_text.clear();
        self.remote_conn_id = 0;
        self.remote_stream_id = 0;
    }
}
