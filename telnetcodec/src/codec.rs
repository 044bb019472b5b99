//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

use super::{CodecError, TelnetEvent, TelnetFrame, TelnetOption, consts};
use crate::options::{OptionSupport, TelnetOptions, TelnetSide};
use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::{trace, warn};

/// Largest subnegotiation payload accepted before the decoder gives up on it.
pub const MAX_SUBNEGOTIATION: usize = 8 * 1024;

/// A codec for the Telnet protocol.
///
/// `TelnetCodec` owns the byte-level decoder state and the option negotiation
/// state for one connection. Negotiation verbs received from the peer are run
/// through the Q-method state machine; any replies it produces are held until
/// the caller collects them with [`TelnetCodec::take_responses`].
pub struct TelnetCodec {
    decoder_buffer: BytesMut,
    decoder_state: DecoderState,
    options: TelnetOptions,
    responses: Vec<TelnetFrame>,
    max_subnegotiation: usize,
}

impl TelnetCodec {
    /// Creates a codec that refuses every option.
    ///
    /// # Example
    /// ```
    /// use linewise_telnetcodec::TelnetCodec;
    ///
    /// let codec = TelnetCodec::new();
    /// ```
    pub fn new() -> TelnetCodec {
        TelnetCodec::default()
    }

    /// Creates a codec advertising the given option table.
    ///
    /// # Example
    /// ```
    /// use linewise_telnetcodec::{OptionSupport, TelnetCodec, TelnetOption};
    ///
    /// let codec = TelnetCodec::with_support(&[
    ///     OptionSupport::new(TelnetOption::Compress2, true, true),
    /// ]);
    /// assert!(codec.is_supported_local(TelnetOption::Compress2));
    /// ```
    pub fn with_support(table: &[OptionSupport]) -> TelnetCodec {
        TelnetCodec {
            options: TelnetOptions::with_support(table),
            ..TelnetCodec::default()
        }
    }

    /// Override the subnegotiation payload limit.
    #[must_use]
    pub fn with_max_subnegotiation(mut self, limit: usize) -> TelnetCodec {
        self.max_subnegotiation = limit;
        self
    }

    /// Checks if we support the given option locally
    pub fn is_supported_local(&self, option: TelnetOption) -> bool {
        self.options.is_supported_local(option)
    }

    /// Checks if we support the given option remotely
    pub fn is_supported_remote(&self, option: TelnetOption) -> bool {
        self.options.is_supported_remote(option)
    }

    /// Checks if a specific Telnet option is enabled locally.
    pub fn is_enabled_local(&self, option: TelnetOption) -> bool {
        self.options.local_enabled(option)
    }

    /// Checks if a specific Telnet option is enabled on the remote side.
    pub fn is_enabled_remote(&self, option: TelnetOption) -> bool {
        self.options.remote_enabled(option)
    }

    /// Request to enable a Telnet option locally (we will send WILL).
    ///
    /// Returns the frame to put on the wire, or `None` if no negotiation is needed.
    pub fn enable_local(&mut self, option: TelnetOption) -> Option<TelnetFrame> {
        self.options.enable_local(option)
    }

    /// Request to disable a Telnet option locally (we will send WONT).
    pub fn disable_local(&mut self, option: TelnetOption) -> Option<TelnetFrame> {
        self.options.disable_local(option)
    }

    /// Request to enable a Telnet option on the remote side (we will send DO).
    pub fn enable_remote(&mut self, option: TelnetOption) -> Option<TelnetFrame> {
        self.options.enable_remote(option)
    }

    /// Request to disable a Telnet option on the remote side (we will send DONT).
    pub fn disable_remote(&mut self, option: TelnetOption) -> Option<TelnetFrame> {
        self.options.disable_remote(option)
    }

    /// Whether negotiation replies are waiting to be sent.
    pub fn has_pending_responses(&self) -> bool {
        !self.responses.is_empty()
    }

    /// Drain the negotiation replies produced by [`Decoder::decode`], oldest first.
    pub fn take_responses(&mut self) -> Vec<TelnetFrame> {
        std::mem::take(&mut self.responses)
    }

    fn negotiate(
        &mut self,
        side: TelnetSide,
        option: TelnetOption,
        frame: TelnetFrame,
    ) -> Result<Option<TelnetEvent>, CodecError> {
        let before = self.options.enabled(side, option);
        trace!(%frame, "Received negotiation");
        if let Some(reply) = self.options.handle_received(frame)? {
            self.responses.push(reply);
        }
        let after = self.options.enabled(side, option);
        if before == after {
            return Ok(None);
        }
        Ok(Some(TelnetEvent::OptionStatus(option, side, after)))
    }

    fn abort_subnegotiation(&mut self) {
        self.decoder_state = DecoderState::NormalData;
        self.decoder_buffer.clear();
    }
}

impl Default for TelnetCodec {
    fn default() -> Self {
        TelnetCodec {
            decoder_buffer: BytesMut::new(),
            decoder_state: DecoderState::NormalData,
            options: TelnetOptions::default(),
            responses: Vec::new(),
            max_subnegotiation: MAX_SUBNEGOTIATION,
        }
    }
}

impl Decoder for TelnetCodec {
    type Item = TelnetEvent;
    type Error = CodecError;

    /// Decode the next event from `src`, consuming bytes one at a time.
    ///
    /// Negotiation verbs that do not change any option state are absorbed
    /// (their replies still queue up); `Ok(None)` means `src` ran dry mid-frame
    /// or was empty, and the partial frame is kept in the decoder state.
    ///
    /// # Errors
    ///
    /// [`CodecError::SubnegotiationOverflow`] when a subnegotiation payload grows
    /// past the configured limit. The decoder resets to normal data afterwards.
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<TelnetEvent>, Self::Error> {
        while src.has_remaining() {
            let byte = src.get_u8();
            match (self.decoder_state, byte) {
                (DecoderState::NormalData, consts::IAC) => {
                    self.decoder_state = DecoderState::InterpretAsCommand;
                }
                (DecoderState::NormalData, _) => {
                    return Ok(Some(TelnetEvent::Data(byte)));
                }
                (DecoderState::InterpretAsCommand, command) => {
                    self.decoder_state = DecoderState::NormalData;
                    let event = match command {
                        consts::IAC => TelnetEvent::Data(consts::IAC),
                        consts::NOP => TelnetEvent::NoOperation,
                        consts::DM => TelnetEvent::DataMark,
                        consts::BRK => TelnetEvent::Break,
                        consts::IP => TelnetEvent::InterruptProcess,
                        consts::AO => TelnetEvent::AbortOutput,
                        consts::AYT => TelnetEvent::AreYouThere,
                        consts::EC => TelnetEvent::EraseCharacter,
                        consts::EL => TelnetEvent::EraseLine,
                        consts::GA => TelnetEvent::GoAhead,
                        consts::EOR => TelnetEvent::EndOfRecord,
                        consts::DO => {
                            self.decoder_state = DecoderState::NegotiateDo;
                            continue;
                        }
                        consts::DONT => {
                            self.decoder_state = DecoderState::NegotiateDont;
                            continue;
                        }
                        consts::WILL => {
                            self.decoder_state = DecoderState::NegotiateWill;
                            continue;
                        }
                        consts::WONT => {
                            self.decoder_state = DecoderState::NegotiateWont;
                            continue;
                        }
                        consts::SB => {
                            self.decoder_state = DecoderState::Subnegotiate;
                            continue;
                        }
                        unknown => {
                            warn!("Received Unknown Command {:#X}", unknown);
                            TelnetEvent::NoOperation
                        }
                    };
                    return Ok(Some(event));
                }
                (DecoderState::NegotiateDo, _) => {
                    self.decoder_state = DecoderState::NormalData;
                    let option = TelnetOption::from_u8(byte);
                    let frame = TelnetFrame::Do(option);
                    if let Some(event) = self.negotiate(TelnetSide::Local, option, frame)? {
                        return Ok(Some(event));
                    }
                }
                (DecoderState::NegotiateDont, _) => {
                    self.decoder_state = DecoderState::NormalData;
                    let option = TelnetOption::from_u8(byte);
                    let frame = TelnetFrame::Dont(option);
                    if let Some(event) = self.negotiate(TelnetSide::Local, option, frame)? {
                        return Ok(Some(event));
                    }
                }
                (DecoderState::NegotiateWill, _) => {
                    self.decoder_state = DecoderState::NormalData;
                    let option = TelnetOption::from_u8(byte);
                    let frame = TelnetFrame::Will(option);
                    if let Some(event) = self.negotiate(TelnetSide::Remote, option, frame)? {
                        return Ok(Some(event));
                    }
                }
                (DecoderState::NegotiateWont, _) => {
                    self.decoder_state = DecoderState::NormalData;
                    let option = TelnetOption::from_u8(byte);
                    let frame = TelnetFrame::Wont(option);
                    if let Some(event) = self.negotiate(TelnetSide::Remote, option, frame)? {
                        return Ok(Some(event));
                    }
                }
                (DecoderState::Subnegotiate, _) => {
                    self.decoder_buffer.clear();
                    self.decoder_state = DecoderState::SubnegotiateArgument(byte);
                }
                (DecoderState::SubnegotiateArgument(option), consts::IAC) => {
                    self.decoder_state = DecoderState::SubnegotiateArgumentIAC(option);
                }
                (DecoderState::SubnegotiateArgument(option), _) => {
                    if self.decoder_buffer.len() >= self.max_subnegotiation {
                        self.abort_subnegotiation();
                        return Err(CodecError::SubnegotiationOverflow {
                            option,
                            limit: self.max_subnegotiation,
                        });
                    }
                    self.decoder_buffer.put_u8(byte);
                }
                (DecoderState::SubnegotiateArgumentIAC(option), consts::IAC) => {
                    if self.decoder_buffer.len() >= self.max_subnegotiation {
                        self.abort_subnegotiation();
                        return Err(CodecError::SubnegotiationOverflow {
                            option,
                            limit: self.max_subnegotiation,
                        });
                    }
                    self.decoder_state = DecoderState::SubnegotiateArgument(option);
                    self.decoder_buffer.put_u8(consts::IAC);
                }
                (DecoderState::SubnegotiateArgumentIAC(option), consts::SE) => {
                    self.decoder_state = DecoderState::NormalData;
                    let payload = self.decoder_buffer.split().freeze();
                    return Ok(Some(TelnetEvent::Subnegotiate(
                        TelnetOption::from_u8(option),
                        payload,
                    )));
                }
                (DecoderState::SubnegotiateArgumentIAC(option), _) => {
                    warn!(
                        option,
                        "Received invalid command {:#X} during subnegotiation, aborting", byte
                    );
                    self.abort_subnegotiation();
                    return Ok(Some(TelnetEvent::NoOperation));
                }
            }
        }
        Ok(None)
    }
}

impl Encoder<u8> for TelnetCodec {
    type Error = CodecError;

    fn encode(&mut self, item: u8, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.reserve(2);
        if item == consts::IAC {
            dst.put_u8(consts::IAC);
        }
        dst.put_u8(item);
        Ok(())
    }
}

impl Encoder<TelnetFrame> for TelnetCodec {
    type Error = CodecError;

    /// Append the wire form of `item` to `dst`.
    ///
    /// Data bytes and subnegotiation payloads have IAC doubled.
    fn encode(&mut self, item: TelnetFrame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.reserve(item.encoded_len() + 1);
        match item {
            TelnetFrame::Data(byte) => return self.encode(byte, dst),
            TelnetFrame::NoOperation => dst.put_slice(&[consts::IAC, consts::NOP]),
            TelnetFrame::DataMark => dst.put_slice(&[consts::IAC, consts::DM]),
            TelnetFrame::Break => dst.put_slice(&[consts::IAC, consts::BRK]),
            TelnetFrame::InterruptProcess => dst.put_slice(&[consts::IAC, consts::IP]),
            TelnetFrame::AbortOutput => dst.put_slice(&[consts::IAC, consts::AO]),
            TelnetFrame::AreYouThere => dst.put_slice(&[consts::IAC, consts::AYT]),
            TelnetFrame::EraseCharacter => dst.put_slice(&[consts::IAC, consts::EC]),
            TelnetFrame::EraseLine => dst.put_slice(&[consts::IAC, consts::EL]),
            TelnetFrame::GoAhead => dst.put_slice(&[consts::IAC, consts::GA]),
            TelnetFrame::EndOfRecord => dst.put_slice(&[consts::IAC, consts::EOR]),
            TelnetFrame::Do(option) => dst.put_slice(&[consts::IAC, consts::DO, option.into()]),
            TelnetFrame::Dont(option) => {
                dst.put_slice(&[consts::IAC, consts::DONT, option.into()]);
            }
            TelnetFrame::Will(option) => {
                dst.put_slice(&[consts::IAC, consts::WILL, option.into()]);
            }
            TelnetFrame::Wont(option) => {
                dst.put_slice(&[consts::IAC, consts::WONT, option.into()]);
            }
            TelnetFrame::Subnegotiate(option, payload) => {
                dst.put_slice(&[consts::IAC, consts::SB, option.into()]);
                for byte in payload {
                    if byte == consts::IAC {
                        dst.put_u8(consts::IAC);
                    }
                    dst.put_u8(byte);
                }
                dst.put_slice(&[consts::IAC, consts::SE]);
            }
        }
        Ok(())
    }
}

/// Decoder position within the Telnet byte stream.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum DecoderState {
    NormalData,
    InterpretAsCommand,
    NegotiateDo,
    NegotiateDont,
    NegotiateWill,
    NegotiateWont,
    Subnegotiate,
    SubnegotiateArgument(u8),
    SubnegotiateArgumentIAC(u8),
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn codec() -> TelnetCodec {
        TelnetCodec::with_support(&[
            OptionSupport::new(TelnetOption::Compress2, true, true),
            OptionSupport::new(TelnetOption::TTYPE, true, false),
        ])
    }

    fn decode_all(codec: &mut TelnetCodec, input: &[u8]) -> Vec<TelnetEvent> {
        let mut buffer = BytesMut::from(input);
        let mut events = Vec::new();
        while let Some(event) = codec.decode(&mut buffer).unwrap() {
            events.push(event);
        }
        events
    }

    #[test]
    fn plain_bytes_decode_as_data() {
        let mut codec = codec();
        let events = decode_all(&mut codec, b"hi\r\n");
        assert_eq!(
            events,
            vec![
                TelnetEvent::Data(b'h'),
                TelnetEvent::Data(b'i'),
                TelnetEvent::Data(consts::CR),
                TelnetEvent::Data(consts::LF),
            ]
        );
    }

    #[test]
    fn escaped_iac_is_a_data_byte() {
        let mut codec = codec();
        let events = decode_all(&mut codec, &[consts::IAC, consts::IAC, b'x']);
        assert_eq!(events, vec![TelnetEvent::Data(0xFF), TelnetEvent::Data(b'x')]);
    }

    #[test]
    fn command_split_across_reads_is_reassembled() {
        let mut codec = codec();
        assert!(decode_all(&mut codec, &[consts::IAC]).is_empty());
        assert!(decode_all(&mut codec, &[consts::DO]).is_empty());
        let events = decode_all(&mut codec, &[consts::option::TTYPE]);
        assert_eq!(
            events,
            vec![TelnetEvent::OptionStatus(TelnetOption::TTYPE, TelnetSide::Local, true)]
        );
        assert_eq!(codec.take_responses(), vec![TelnetFrame::Will(TelnetOption::TTYPE)]);
    }

    #[test]
    fn refused_option_queues_reply_without_event() {
        let mut codec = codec();
        let events = decode_all(&mut codec, &[consts::IAC, consts::WILL, consts::option::ECHO]);
        assert!(events.is_empty());
        assert!(codec.has_pending_responses());
        assert_eq!(codec.take_responses(), vec![TelnetFrame::Dont(TelnetOption::Echo)]);
        assert!(!codec.has_pending_responses());
    }

    #[test]
    fn answer_to_our_offer_reports_status_without_reply() {
        let mut codec = codec();
        assert_eq!(
            codec.enable_local(TelnetOption::Compress2),
            Some(TelnetFrame::Will(TelnetOption::Compress2))
        );
        let events = decode_all(&mut codec, &[consts::IAC, consts::DO, consts::option::COMPRESS2]);
        assert_eq!(
            events,
            vec![TelnetEvent::OptionStatus(TelnetOption::Compress2, TelnetSide::Local, true)]
        );
        assert!(codec.take_responses().is_empty());
        assert!(codec.is_enabled_local(TelnetOption::Compress2));
    }

    #[test]
    fn subnegotiation_payload_is_unescaped() {
        let mut codec = codec();
        let events = decode_all(
            &mut codec,
            &[
                consts::IAC,
                consts::SB,
                consts::option::TTYPE,
                0,
                b'x',
                consts::IAC,
                consts::IAC,
                consts::IAC,
                consts::SE,
            ],
        );
        assert_eq!(
            events,
            vec![TelnetEvent::Subnegotiate(
                TelnetOption::TTYPE,
                Bytes::from_static(&[0, b'x', 0xFF])
            )]
        );
    }

    #[test]
    fn oversized_subnegotiation_is_an_error() {
        let mut codec = codec().with_max_subnegotiation(4);
        let mut input = BytesMut::from(
            &[consts::IAC, consts::SB, consts::option::TTYPE, 1, 2, 3, 4, 5][..],
        );
        assert_eq!(
            codec.decode(&mut input),
            Err(CodecError::SubnegotiationOverflow {
                option: consts::option::TTYPE,
                limit: 4
            })
        );
        // Decoder is back to normal data afterwards.
        assert_eq!(codec.decode(&mut BytesMut::from(&b"a"[..])), Ok(Some(TelnetEvent::Data(b'a'))));
    }

    #[test]
    fn encode_frames() {
        let mut codec = codec();
        let mut out = BytesMut::new();
        codec.encode(TelnetFrame::Data(0xFF), &mut out).unwrap();
        codec.encode(TelnetFrame::Will(TelnetOption::Compress2), &mut out).unwrap();
        codec
            .encode(
                TelnetFrame::Subnegotiate(TelnetOption::Compress2, Bytes::new()),
                &mut out,
            )
            .unwrap();
        assert_eq!(
            &out[..],
            &[
                0xFF,
                0xFF,
                consts::IAC,
                consts::WILL,
                consts::option::COMPRESS2,
                consts::IAC,
                consts::SB,
                consts::option::COMPRESS2,
                consts::IAC,
                consts::SE,
            ]
        );
    }
}
