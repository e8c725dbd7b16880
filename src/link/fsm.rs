//! Option negotiation automaton - RFC 1661 section 4
//!
//! One table-driven state machine shared by every option-negotiating
//! control protocol. The state transition table is transcribed from
//! RFC 1661 4.1; the restart ("r") and crossed-connection ("x") notes carry
//! no action. Protocol specifics enter only through [`ControlProtocol`] and
//! the option registry.

use super::options::{Negotiated, OptionFlags, OptionSet};
use super::{Context, LayerEvent, ProtocolId};
use crate::protocol::control::{
    codes, ControlBuilder, ControlOption, ControlPacket, CONTROL_HEADER_SIZE,
};
use crate::protocol::lcp;
use bitflags::bitflags;
use std::time::Duration;
use tracing::{debug, info, trace};

/// Automaton states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    Initial,
    Starting,
    Closed,
    Stopped,
    Closing,
    Stopping,
    ReqSent,
    AckRcvd,
    AckSent,
    Opened,
}

impl State {
    pub const COUNT: usize = 10;
    pub const ALL: [State; Self::COUNT] = [
        State::Initial,
        State::Starting,
        State::Closed,
        State::Stopped,
        State::Closing,
        State::Stopping,
        State::ReqSent,
        State::AckRcvd,
        State::AckSent,
        State::Opened,
    ];
}

/// Automaton events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event {
    Up,
    Down,
    Open,
    Close,
    /// Timeout with counter > 0
    ToPlus,
    /// Timeout with counter expired
    ToMinus,
    /// Receive-Configure-Request (good)
    RcrPlus,
    /// Receive-Configure-Request (bad)
    RcrMinus,
    /// Receive-Configure-Ack
    Rca,
    /// Receive-Configure-Nak/Rej
    Rcn,
    /// Receive-Terminate-Request
    Rtr,
    /// Receive-Terminate-Ack
    Rta,
    /// Receive-Unknown-Code
    Ruc,
    /// Receive-Code-Reject (permitted) or Receive-Protocol-Reject
    RxjPlus,
    /// Receive-Code-Reject (catastrophic) or Receive-Protocol-Reject
    RxjMinus,
    /// Receive-Echo-Request, Echo-Reply or Discard-Request
    Rxr,
}

impl Event {
    pub const COUNT: usize = 16;
    pub const ALL: [Event; Self::COUNT] = [
        Event::Up,
        Event::Down,
        Event::Open,
        Event::Close,
        Event::ToPlus,
        Event::ToMinus,
        Event::RcrPlus,
        Event::RcrMinus,
        Event::Rca,
        Event::Rcn,
        Event::Rtr,
        Event::Rta,
        Event::Ruc,
        Event::RxjPlus,
        Event::RxjMinus,
        Event::Rxr,
    ];
}

bitflags! {
    /// Actions of one transition. Bit order is execution order.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Actions: u16 {
        /// This-Layer-Up
        const TLU = 1 << 0;
        /// This-Layer-Down
        const TLD = 1 << 1;
        /// This-Layer-Started
        const TLS = 1 << 2;
        /// This-Layer-Finished
        const TLF = 1 << 3;
        /// Initialize-Restart-Count
        const IRC = 1 << 4;
        /// Zero-Restart-Count
        const ZRC = 1 << 5;
        /// Send-Configure-Request
        const SCR = 1 << 6;
        /// Send-Configure-Ack
        const SCA = 1 << 7;
        /// Send-Configure-Nak/Rej
        const SCN = 1 << 8;
        /// Send-Terminate-Request
        const STR = 1 << 9;
        /// Send-Terminate-Ack
        const STA = 1 << 10;
        /// Send-Code-Reject
        const SCJ = 1 << 11;
        /// Send-Echo-Reply
        const SER = 1 << 12;
    }
}

use State::{
    AckRcvd as ARC, AckSent as ASN, Closed as CLD, Closing as CLG, Initial as INI,
    Opened as OPN, ReqSent as RQS, Starting as STG, Stopped as STD, Stopping as SPG,
};

const fn s(state: State) -> Option<State> {
    Some(state)
}

const N: Option<State> = None;
const NO: Actions = Actions::empty();
const TLF: Actions = Actions::TLF;
const TLS: Actions = Actions::TLS;
const SCR: Actions = Actions::SCR;
const STR: Actions = Actions::STR;
const STA: Actions = Actions::STA;
const SCJ: Actions = Actions::SCJ;
const SER: Actions = Actions::SER;
const TLD: Actions = Actions::TLD;
const IRC_SCR: Actions = Actions::IRC.union(Actions::SCR);
const IRC_STR: Actions = Actions::IRC.union(Actions::STR);
const SCA_TLU: Actions = Actions::SCA.union(Actions::TLU);
const IRC_TLU: Actions = Actions::IRC.union(Actions::TLU);
const TLD_SCR: Actions = Actions::TLD.union(Actions::SCR);
const TLD_IRC_STR: Actions = Actions::TLD.union(IRC_STR);
const IRC_SCR_SCA: Actions = IRC_SCR.union(Actions::SCA);
const IRC_SCR_SCN: Actions = IRC_SCR.union(Actions::SCN);
const TLD_SCR_SCA: Actions = TLD_SCR.union(Actions::SCA);
const TLD_SCR_SCN: Actions = TLD_SCR.union(Actions::SCN);
const TLD_ZRC_STA: Actions = Actions::TLD.union(Actions::ZRC).union(Actions::STA);
const SCA: Actions = Actions::SCA;
const SCN: Actions = Actions::SCN;
const IRC: Actions = Actions::IRC;

/// `NEXT_STATE[event][state]`; `None` marks an illegal event for the state
#[rustfmt::skip]
pub const NEXT_STATE: [[Option<State>; State::COUNT]; Event::COUNT] = [
    //      Initial  Starting Closed  Stopped  Closing  Stopping ReqSent  AckRcvd  AckSent  Opened
    /*Up*/  [s(CLD), s(RQS),  N,      N,       N,       N,       N,       N,       N,       N],
    /*Dn*/  [N,      N,       s(INI), s(STG),  s(INI),  s(STG),  s(STG),  s(STG),  s(STG),  s(STG)],
    /*Op*/  [s(STG), s(STG),  s(RQS), s(STD),  s(SPG),  s(SPG),  s(RQS),  s(ARC),  s(ASN),  s(OPN)],
    /*Cl*/  [s(INI), s(INI),  s(CLD), s(CLD),  s(CLG),  s(CLG),  s(CLG),  s(CLG),  s(CLG),  s(CLG)],
    /*TO+*/ [N,      N,       N,      N,       s(CLG),  s(SPG),  s(RQS),  s(RQS),  s(ASN),  N],
    /*TO-*/ [N,      N,       N,      N,       s(CLD),  s(STD),  s(STD),  s(STD),  s(STD),  N],
    /*RCR+*/[N,      N,       s(CLD), s(ASN),  s(CLG),  s(SPG),  s(ASN),  s(OPN),  s(ASN),  s(ASN)],
    /*RCR-*/[N,      N,       s(CLD), s(RQS),  s(CLG),  s(SPG),  s(RQS),  s(ARC),  s(RQS),  s(RQS)],
    /*RCA*/ [N,      N,       s(CLD), s(STD),  s(CLG),  s(SPG),  s(ARC),  s(RQS),  s(OPN),  s(RQS)],
    /*RCN*/ [N,      N,       s(CLD), s(STD),  s(CLG),  s(SPG),  s(RQS),  s(RQS),  s(ASN),  s(RQS)],
    /*RTR*/ [N,      N,       s(CLD), s(STD),  s(CLG),  s(SPG),  s(RQS),  s(RQS),  s(RQS),  s(SPG)],
    /*RTA*/ [N,      N,       s(CLD), s(STD),  s(CLD),  s(STD),  s(RQS),  s(RQS),  s(ASN),  s(RQS)],
    /*RUC*/ [N,      N,       s(CLD), s(STD),  s(CLG),  s(SPG),  s(RQS),  s(ARC),  s(ASN),  s(OPN)],
    /*RXJ+*/[N,      N,       s(CLD), s(STD),  s(CLG),  s(SPG),  s(RQS),  s(RQS),  s(ASN),  s(OPN)],
    /*RXJ-*/[N,      N,       s(CLD), s(STD),  s(CLD),  s(STD),  s(STD),  s(STD),  s(STD),  s(SPG)],
    /*RXR*/ [N,      N,       s(CLD), s(STD),  s(CLG),  s(SPG),  s(RQS),  s(ARC),  s(ASN),  s(OPN)],
];

/// `ACTIONS[event][state]`; only meaningful where `NEXT_STATE` is defined
#[rustfmt::skip]
pub const ACTIONS: [[Actions; State::COUNT]; Event::COUNT] = [
    //      Initial Starting Closed   Stopped      Closing Stopping ReqSent  AckRcvd  AckSent  Opened
    /*Up*/  [NO,    IRC_SCR, NO,      NO,          NO,     NO,      NO,      NO,      NO,      NO],
    /*Dn*/  [NO,    NO,      NO,      TLS,         NO,     NO,      NO,      NO,      NO,      TLD],
    /*Op*/  [TLS,   NO,      IRC_SCR, NO,          NO,     NO,      NO,      NO,      NO,      NO],
    /*Cl*/  [NO,    TLF,     NO,      NO,          NO,     NO,      IRC_STR, IRC_STR, IRC_STR, TLD_IRC_STR],
    /*TO+*/ [NO,    NO,      NO,      NO,          STR,    STR,     SCR,     SCR,     SCR,     NO],
    /*TO-*/ [NO,    NO,      NO,      NO,          TLF,    TLF,     TLF,     TLF,     TLF,     NO],
    /*RCR+*/[NO,    NO,      STA,     IRC_SCR_SCA, NO,     NO,      SCA,     SCA_TLU, SCA,     TLD_SCR_SCA],
    /*RCR-*/[NO,    NO,      STA,     IRC_SCR_SCN, NO,     NO,      SCN,     SCN,     SCN,     TLD_SCR_SCN],
    /*RCA*/ [NO,    NO,      STA,     STA,         NO,     NO,      IRC,     SCR,     IRC_TLU, TLD_SCR],
    /*RCN*/ [NO,    NO,      STA,     STA,         NO,     NO,      IRC_SCR, SCR,     IRC_SCR, TLD_SCR],
    /*RTR*/ [NO,    NO,      STA,     STA,         STA,    STA,     STA,     STA,     STA,     TLD_ZRC_STA],
    /*RTA*/ [NO,    NO,      NO,      NO,          TLF,    TLF,     NO,      NO,      NO,      TLD_SCR],
    /*RUC*/ [NO,    NO,      SCJ,     SCJ,         SCJ,    SCJ,     SCJ,     SCJ,     SCJ,     SCJ],
    /*RXJ+*/[NO,    NO,      NO,      NO,          NO,     NO,      NO,      NO,      NO,      NO],
    /*RXJ-*/[NO,    NO,      TLF,     TLF,         TLF,    TLF,     TLF,     TLF,     TLF,     TLD_IRC_STR],
    /*RXR*/ [NO,    NO,      NO,      NO,          NO,     NO,      NO,      NO,      NO,      SER],
];

/// Look up a transition; `None` for illegal (event, state) pairs
pub fn transition(state: State, event: Event) -> Option<(State, Actions)> {
    let next = NEXT_STATE[event as usize][state as usize]?;
    Some((next, ACTIONS[event as usize][state as usize]))
}

/// Restart timer and counter limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FsmConfig {
    pub restart: Duration,
    pub max_configure: u8,
    pub max_terminate: u8,
}

impl Default for FsmConfig {
    fn default() -> Self {
        Self {
            restart: Duration::from_secs(3),
            max_configure: 10,
            max_terminate: 3,
        }
    }
}

/// Protocol-specific half of an automaton
pub trait ControlProtocol {
    const ID: ProtocolId;
    /// PPP protocol number
    const NUMBER: u16;
    const NAME: &'static str;
    /// Bit `n` set for every supported code `n`
    const SUPPORTED_CODES: u16;

    /// Fresh option registry
    fn options(&self) -> OptionSet;

    /// This-Layer-Up hook
    fn layer_up(&mut self, _negotiated: &Negotiated, _cx: &mut Context) {}

    /// This-Layer-Down hook
    fn layer_down(&mut self, _cx: &mut Context) {}
}

/// Bitmask of codes `first..=last`
pub const fn code_mask(first: u8, last: u8) -> u16 {
    let mut mask = 0u16;
    let mut code = first;
    while code <= last {
        mask |= 1 << code;
        code += 1;
    }
    mask
}

/// Option negotiation automaton for protocol `P`
#[derive(Debug)]
pub struct Automaton<P: ControlProtocol> {
    protocol: P,
    config: FsmConfig,
    state: State,
    restart_counter: u8,
    options: OptionSet,
    negotiated: Negotiated,
    /// Identifier and options of the outstanding Configure-Request
    last_request: Option<(u8, Vec<u8>)>,
    /// Identifier of the outstanding Terminate-Request
    last_terminate: Option<u8>,
    request_id: u8,
    terminate_id: u8,
    reject_id: u8,
}

impl<P: ControlProtocol> Automaton<P> {
    pub fn new(protocol: P, config: FsmConfig) -> Self {
        let options = protocol.options();
        Self {
            protocol,
            config,
            state: State::Initial,
            restart_counter: 0,
            options,
            negotiated: Negotiated::default(),
            last_request: None,
            last_terminate: None,
            request_id: 0,
            terminate_id: 0,
            reject_id: 0,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn restart_counter(&self) -> u8 {
        self.restart_counter
    }

    pub fn negotiated(&self) -> &Negotiated {
        &self.negotiated
    }

    pub fn options(&self) -> &OptionSet {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut OptionSet {
        &mut self.options
    }

    pub fn protocol(&self) -> &P {
        &self.protocol
    }

    /// Next identifier for Code-Reject and Protocol-Reject
    pub fn next_reject_id(&mut self) -> u8 {
        self.reject_id = self.reject_id.wrapping_add(1);
        self.reject_id
    }

    /// Feed a message from another layer or the timer
    pub fn handle(&mut self, event: LayerEvent, cx: &mut Context) {
        let event = match event {
            LayerEvent::LinkUp => Event::Up,
            LayerEvent::LinkDown => Event::Down,
            LayerEvent::Open => Event::Open,
            LayerEvent::Close => Event::Close,
            LayerEvent::Timeout if self.restart_counter > 0 => Event::ToPlus,
            LayerEvent::Timeout => Event::ToMinus,
            other => {
                trace!("{}: ignoring {:?}", P::NAME, other);
                return;
            }
        };
        self.dispatch(event, None, cx);
    }

    /// Feed a received control packet (the PPP information field)
    pub fn receive(&mut self, data: &[u8], cx: &mut Context) {
        let packet = match ControlPacket::parse(data) {
            Ok(p) => p,
            Err(e) => {
                debug!("{}: dropping packet: {}", P::NAME, e);
                return;
            }
        };

        debug!(
            "{}: received {} id={} len={} in {:?}",
            P::NAME,
            codes::name(packet.code()),
            packet.identifier(),
            packet.length(),
            self.state
        );

        let code = packet.code();
        if code >= 16 || P::SUPPORTED_CODES & (1 << code) == 0 {
            self.dispatch(Event::Ruc, Some(&packet), cx);
            return;
        }

        let event = match code {
            codes::CONFIGURE_REQUEST => self.classify_request(&packet),
            codes::CONFIGURE_ACK => self.check_ack(&packet),
            codes::CONFIGURE_NAK => self.check_nak(&packet),
            codes::CONFIGURE_REJECT => self.check_reject(&packet, cx),
            codes::TERMINATE_REQUEST => Some(Event::Rtr),
            codes::TERMINATE_ACK => self.check_terminate_ack(&packet),
            codes::CODE_REJECT => self.classify_code_reject(&packet),
            codes::PROTOCOL_REJECT => self.classify_protocol_reject(&packet, cx),
            codes::ECHO_REQUEST | codes::ECHO_REPLY | codes::DISCARD_REQUEST => Some(Event::Rxr),
            _ => Some(Event::Ruc),
        };

        match event {
            Some(event) => self.dispatch(event, Some(&packet), cx),
            None => debug!(
                "{}: dropped {} id={}",
                P::NAME,
                codes::name(code),
                packet.identifier()
            ),
        }
    }

    /// Run one event through the tables
    pub fn dispatch(&mut self, event: Event, packet: Option<&ControlPacket>, cx: &mut Context) {
        let Some((next, actions)) = transition(self.state, event) else {
            debug!("{}: illegal event {:?} in {:?}", P::NAME, event, self.state);
            return;
        };

        if event == Event::RcrPlus && actions.contains(Actions::SCA) {
            if let Some(packet) = packet {
                self.apply_options(packet, true);
            }
        }

        self.run_actions(actions, packet, cx);

        if next != self.state {
            debug!("{}: {:?} -> {:?} on {:?}", P::NAME, self.state, next, event);
        }
        self.state = next;
        if matches!(next, State::Closed | State::Stopped | State::Opened) {
            cx.cancel(P::ID);
        }
    }

    fn run_actions(&mut self, actions: Actions, packet: Option<&ControlPacket>, cx: &mut Context) {
        if actions.contains(Actions::TLU) {
            info!("{}: layer up", P::NAME);
            self.options.reset();
            self.protocol.layer_up(&self.negotiated, cx);
            if let Some(upper) = P::ID.upper() {
                cx.notify(upper, LayerEvent::LinkUp);
            }
        }
        if actions.contains(Actions::TLD) {
            info!("{}: layer down", P::NAME);
            self.options.reset();
            self.protocol.layer_down(cx);
            if let Some(upper) = P::ID.upper() {
                cx.notify(upper, LayerEvent::LinkDown);
            }
        }
        if actions.contains(Actions::TLS) {
            if let Some(lower) = P::ID.lower() {
                cx.notify(lower, LayerEvent::UlStarted);
            }
        }
        if actions.contains(Actions::TLF) {
            info!("{}: layer finished", P::NAME);
            if let Some(lower) = P::ID.lower() {
                cx.notify(lower, LayerEvent::UlFinished);
            }
        }
        if actions.contains(Actions::IRC) {
            self.restart_counter = if actions.contains(Actions::STR) {
                self.config.max_terminate
            } else {
                self.config.max_configure
            };
        }
        if actions.contains(Actions::ZRC) {
            self.restart_counter = 0;
            cx.schedule(P::ID, self.config.restart);
        }
        if actions.contains(Actions::SCR) {
            self.send_configure_request(cx);
        }
        if let Some(packet) = packet {
            if actions.contains(Actions::SCA) {
                self.send_configure_ack(packet, cx);
            }
            if actions.contains(Actions::SCN) {
                self.send_configure_nak(packet, cx);
            }
        }
        if actions.contains(Actions::STR) {
            self.send_terminate_request(cx);
        }
        if actions.contains(Actions::STA) {
            self.send_terminate_ack(packet, cx);
        }
        if let Some(packet) = packet {
            if actions.contains(Actions::SCJ) {
                self.send_code_reject(packet, cx);
            }
            if actions.contains(Actions::SER) {
                self.send_echo_reply(packet, cx);
            }
        }
    }

    fn send_configure_request(&mut self, cx: &mut Context) {
        self.restart_counter = self.restart_counter.saturating_sub(1);
        self.request_id = self.request_id.wrapping_add(1);

        let options = self.options.serialize();
        let packet = ControlBuilder::configure_request(self.request_id)
            .raw_data(&options)
            .build();
        debug!(
            "{}: sending Configure-Request id={} ({} left)",
            P::NAME,
            self.request_id,
            self.restart_counter
        );

        self.last_request = Some((self.request_id, options));
        cx.send(P::NUMBER, &packet);
        cx.schedule(P::ID, self.config.restart);
    }

    fn send_configure_ack(&mut self, request: &ControlPacket, cx: &mut Context) {
        let packet = ControlBuilder::configure_ack(request.identifier())
            .raw_data(request.data())
            .build();
        debug!("{}: sending Configure-Ack id={}", P::NAME, request.identifier());
        cx.send(P::NUMBER, &packet);
    }

    fn send_configure_nak(&mut self, request: &ControlPacket, cx: &mut Context) {
        let Ok(received) = request.options() else {
            return;
        };

        let unknown: Vec<&ControlOption> = received
            .iter()
            .filter(|opt| self.options.get_conf_by_code(opt.opt_type).is_none())
            .collect();

        let packet = if !unknown.is_empty() {
            let mut data = Vec::new();
            for opt in unknown {
                opt.write_to(&mut data);
            }
            debug!("{}: sending Configure-Reject id={}", P::NAME, request.identifier());
            ControlBuilder::configure_reject(request.identifier())
                .raw_data(&data)
                .build()
        } else {
            let mut builder = ControlBuilder::configure_nak(request.identifier());
            for opt in &received {
                if let Some(conf) = self.options.get_conf_by_code(opt.opt_type) {
                    if !conf.validate(opt.data) {
                        builder = builder.add_option(opt.opt_type, &conf.build_nak(Some(opt.data)));
                    }
                }
            }
            for conf in self.options.missing_required(&received) {
                builder = builder.add_option(conf.type_code, &conf.build_nak(None));
            }
            debug!("{}: sending Configure-Nak id={}", P::NAME, request.identifier());
            builder.build()
        };
        cx.send(P::NUMBER, &packet);
    }

    fn send_terminate_request(&mut self, cx: &mut Context) {
        self.restart_counter = self.restart_counter.saturating_sub(1);
        self.terminate_id = self.terminate_id.wrapping_add(1);
        self.last_terminate = Some(self.terminate_id);

        let packet = ControlBuilder::terminate_request(self.terminate_id).build();
        debug!(
            "{}: sending Terminate-Request id={} ({} left)",
            P::NAME,
            self.terminate_id,
            self.restart_counter
        );
        cx.send(P::NUMBER, &packet);
        cx.schedule(P::ID, self.config.restart);
    }

    fn send_terminate_ack(&mut self, trigger: Option<&ControlPacket>, cx: &mut Context) {
        let (id, data) = match trigger {
            Some(p) if p.code() == codes::TERMINATE_REQUEST => (p.identifier(), p.data()),
            Some(p) => (p.identifier(), &[][..]),
            None => (self.terminate_id, &[][..]),
        };
        let packet = ControlBuilder::terminate_ack(id).raw_data(data).build();
        debug!("{}: sending Terminate-Ack id={}", P::NAME, id);
        cx.send(P::NUMBER, &packet);
    }

    fn send_code_reject(&mut self, rejected: &ControlPacket, cx: &mut Context) {
        let id = self.next_reject_id();
        // The rejected packet is cut to fit the peer's MRU
        let room = (self.negotiated.peer_mru as usize).saturating_sub(CONTROL_HEADER_SIZE);
        let bytes = rejected.as_bytes();
        let packet = ControlBuilder::code_reject(id)
            .raw_data(&bytes[..bytes.len().min(room)])
            .build();
        debug!(
            "{}: sending Code-Reject id={} for code {}",
            P::NAME,
            id,
            rejected.code()
        );
        cx.send(P::NUMBER, &packet);
    }

    fn send_echo_reply(&mut self, packet: &ControlPacket, cx: &mut Context) {
        if packet.code() == codes::ECHO_REQUEST {
            // Magic-Number is never negotiated, so ours is zero
            let data = lcp::echo_parts(packet).map_or(&[][..], |(_, data)| data);
            let reply = lcp::echo_reply(packet.identifier(), 0, data);
            cx.send(P::NUMBER, &reply);
        }
        if let Some(lower) = P::ID.lower() {
            cx.notify(lower, LayerEvent::LinkAlive);
        }
    }

    fn classify_request(&self, packet: &ControlPacket) -> Option<Event> {
        let received = packet.options().ok()?;
        if self.options.accepts(&received) {
            Some(Event::RcrPlus)
        } else {
            Some(Event::RcrMinus)
        }
    }

    fn apply_options(&mut self, packet: &ControlPacket, peer: bool) {
        let Ok(received) = packet.options() else {
            return;
        };
        if peer {
            self.negotiated.reset_peer();
        } else {
            self.negotiated.reset_local();
        }
        for opt in received {
            if let Some(conf) = self.options.get_conf_by_code(opt.opt_type) {
                conf.apply(opt.data, peer, &mut self.negotiated);
            }
        }
    }

    fn check_ack(&mut self, packet: &ControlPacket) -> Option<Event> {
        match &self.last_request {
            Some((id, sent)) if *id == packet.identifier() && sent.as_slice() == packet.data() => {}
            _ => return None,
        }
        self.last_request = None;
        self.apply_options(packet, false);
        Some(Event::Rca)
    }

    fn check_nak(&mut self, packet: &ControlPacket) -> Option<Event> {
        match &self.last_request {
            Some((id, _)) if *id == packet.identifier() => {}
            _ => return None,
        }
        let suggestions = packet.options().ok()?;
        self.last_request = None;

        for suggestion in suggestions {
            let Some(conf) = self.options.get_conf_by_code_mut(suggestion.opt_type) else {
                continue;
            };
            if conf.adopt(suggestion.data) {
                conf.flags.insert(OptionFlags::ENABLED);
            } else {
                debug!(
                    "{}: disabling option {} after invalid suggestion",
                    P::NAME,
                    suggestion.opt_type
                );
                conf.flags.remove(OptionFlags::ENABLED);
            }
        }
        Some(Event::Rcn)
    }

    fn check_reject(&mut self, packet: &ControlPacket, cx: &mut Context) -> Option<Event> {
        let sent = match &self.last_request {
            Some((id, sent)) if *id == packet.identifier() => sent,
            _ => return None,
        };
        if packet.data().len() > sent.len() {
            return None;
        }

        let sent_options = crate::protocol::control::parse_options(sent).ok()?;
        let rejected = packet.options().ok()?;
        if !rejected.iter().all(|r| sent_options.contains(r)) {
            return None;
        }

        let rejected: Vec<u8> = rejected.iter().map(|r| r.opt_type).collect();
        self.last_request = None;

        let mut fatal = false;
        for opt_type in rejected {
            if let Some(conf) = self.options.get_conf_by_code_mut(opt_type) {
                fatal |= conf.is_required();
                conf.flags.remove(OptionFlags::ENABLED);
            }
        }

        if fatal {
            info!("{}: peer rejected a required option, closing", P::NAME);
            cx.notify(P::ID, LayerEvent::Close);
            return None;
        }
        Some(Event::Rcn)
    }

    fn check_terminate_ack(&mut self, packet: &ControlPacket) -> Option<Event> {
        if self.last_terminate != Some(packet.identifier()) {
            return None;
        }
        self.last_terminate = None;
        Some(Event::Rta)
    }

    fn classify_code_reject(&self, packet: &ControlPacket) -> Option<Event> {
        let &rejected = packet.data().first()?;
        if (codes::CONFIGURE_REQUEST..=codes::TERMINATE_ACK).contains(&rejected) {
            info!(
                "{}: peer rejected {}, negotiation impossible",
                P::NAME,
                codes::name(rejected)
            );
            Some(Event::RxjMinus)
        } else {
            Some(Event::RxjPlus)
        }
    }

    fn classify_protocol_reject(&self, packet: &ControlPacket, cx: &mut Context) -> Option<Event> {
        let rejected = lcp::rejected_protocol(packet)?;
        if rejected == P::NUMBER {
            return Some(Event::RxjMinus);
        }
        info!("{}: peer rejected protocol 0x{:04x}", P::NAME, rejected);
        if let Some(id) = ProtocolId::from_number(rejected) {
            cx.notify(id, LayerEvent::LinkDown);
        }
        Some(Event::RxjPlus)
    }
}
