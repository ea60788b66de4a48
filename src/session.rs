//! Stateful KNXnet/IP tunnel session.
//!
//! Wraps the [`crate::protocol::tunnel::TunnelClient`] state machine with a
//! background receiver thread, a heartbeat thread, and the value cache /
//! listener registry a real application needs to talk to a gateway.

use std::net::{Ipv4Addr, SocketAddrV4, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender};
use log::{debug, error, info, warn};
use parking_lot::Mutex;

use crate::addressing::{GroupAddress, IndividualAddress};
use crate::cache::ValueCache;
use crate::config::GatewayConfig;
use crate::discovery::discover_gateway;
use crate::error::{KnxError, Result};
use crate::listener::{ListenerFn, ListenerId, ListenerRegistry};
use crate::protocol::cemi::{CEMIFrame, LDataRequest};
use crate::protocol::constants::{
    CEMIMessageCode, ServiceType, E_CONNECTION_ID, E_DATA_CONNECTION, E_KNX_CONNECTION, E_NO_ERROR,
};
use crate::protocol::frame::KnxnetIpFrame;
use crate::protocol::services::ConnectionHeader;
use crate::protocol::tunnel::TunnelClient;

/// A single group payload received from the bus, pushed into the result
/// queue a pending `group_read` waits on.
type GroupPayload = Vec<u8>;

/// A callback invoked for every received group payload, before per-address
/// listeners
pub type NotifyFn = Box<dyn Fn(GroupAddress, &[u8]) + Send + Sync>;

/// Outcome of a CONNECT_RESPONSE, forwarded from the receiver thread to the
/// thread blocked in [`TunnelSession::connect`]
enum ConnectSignal {
    Ok,
    Failed(u8),
}

struct Channels {
    ack_tx: Sender<()>,
    ack_rx: Receiver<()>,
    conn_state_tx: Sender<u8>,
    conn_state_rx: Receiver<u8>,
    connect_tx: Sender<ConnectSignal>,
    connect_rx: Receiver<ConnectSignal>,
    result_tx: Sender<GroupPayload>,
    result_rx: Receiver<GroupPayload>,
}

impl Channels {
    fn new() -> Self {
        let (ack_tx, ack_rx) = bounded(1);
        let (conn_state_tx, conn_state_rx) = bounded(1);
        let (connect_tx, connect_rx) = bounded(1);
        let (result_tx, result_rx) = bounded(16);
        Self { ack_tx, ack_rx, conn_state_tx, conn_state_rx, connect_tx, connect_rx, result_tx, result_rx }
    }

    fn drain_results(&self) {
        while self.result_rx.try_recv().is_ok() {}
    }
}

struct Inner {
    client: Mutex<TunnelClient>,
    socket: Mutex<Option<UdpSocket>>,
    cache: ValueCache,
    listeners: ListenerRegistry,
    notify: Mutex<Option<NotifyFn>>,
    channels: Channels,
    send_lock: Mutex<()>,
    running: AtomicBool,
    receiver_thread: Mutex<Option<JoinHandle<()>>>,
    heartbeat_thread: Mutex<Option<JoinHandle<()>>>,
    config: Mutex<GatewayConfig>,
}

/// A connection to a KNX/IP tunnelling gateway
///
/// Each session owns its own socket, value cache, and listener registry --
/// nothing is shared across sessions.
#[derive(Clone)]
pub struct TunnelSession {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for TunnelSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TunnelSession").field("connected", &self.is_connected()).finish()
    }
}

impl TunnelSession {
    /// Create a session targeting a known gateway, not yet connected
    #[must_use]
    pub fn new(config: GatewayConfig) -> Self {
        let gateway_addr = config.gateway.unwrap_or(Ipv4Addr::new(0, 0, 0, 0));
        let client = TunnelClient::new(gateway_addr.octets(), config.port);

        Self {
            inner: Arc::new(Inner {
                client: Mutex::new(client),
                socket: Mutex::new(None),
                cache: ValueCache::new(),
                listeners: ListenerRegistry::new(),
                notify: Mutex::new(None),
                channels: Channels::new(),
                send_lock: Mutex::new(()),
                running: AtomicBool::new(false),
                receiver_thread: Mutex::new(None),
                heartbeat_thread: Mutex::new(None),
                config: Mutex::new(config),
            }),
        }
    }

    /// Whether the tunnel is currently connected
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.inner.client.lock().is_connected()
    }

    /// Access the per-session value cache
    #[must_use]
    pub fn cache(&self) -> &ValueCache {
        &self.inner.cache
    }

    /// Set the global notify callback, invoked for every received group
    /// payload before per-address listeners
    pub fn set_notify(&self, func: NotifyFn) {
        *self.inner.notify.lock() = Some(func);
    }

    /// Register a listener for `address`
    pub fn register_listener(&self, address: GroupAddress, func: ListenerFn) -> ListenerId {
        self.inner.listeners.register(address, func)
    }

    /// Remove a previously registered listener
    ///
    /// Returns `false` if the address has no matching listener; this is not
    /// an error.
    pub fn unregister_listener(&self, address: GroupAddress, id: ListenerId) -> bool {
        self.inner.listeners.unregister(address, id)
    }

    /// Connect to the gateway, discovering one first if none was configured
    ///
    /// Idempotent: if already connected, returns immediately.
    ///
    /// # Errors
    ///
    /// Returns `Timeout` if discovery or the gateway handshake does not
    /// complete within the configured timeout, or `ProtocolError` if the
    /// gateway rejects the connection.
    pub fn connect(&self) -> Result<()> {
        if self.is_connected() {
            debug!("connect() ignored, already connected");
            return Ok(());
        }

        let mut config = *self.inner.config.lock();
        let gateway = match config.gateway {
            Some(ip) => ip,
            None => {
                let found = discover_gateway(config.response_timeout)?
                    .ok_or_else(|| KnxError::bad_operation("no KNX gateway found by discovery"))?;
                let ip = Ipv4Addr::from(found.ip);
                info!("discovered KNX gateway {ip}:{}", found.port);
                config.gateway = Some(ip);
                config.port = found.port;
                *self.inner.config.lock() = config;
                ip
            }
        };

        self.inner.cache.clear();
        self.inner.channels.drain_results();

        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.connect(SocketAddrV4::new(gateway, config.port))?;
        socket.set_read_timeout(Some(Duration::from_millis(200)))?;

        *self.inner.client.lock() = TunnelClient::new(gateway.octets(), config.port);
        *self.inner.socket.lock() = Some(socket.try_clone()?);

        self.start_receiver(socket);

        let frame = {
            let mut client = self.inner.client.lock();
            let frame = client.build_connect_request()?;
            frame.to_vec()
        };
        self.send_raw(&frame)?;

        match self.inner.channels.connect_rx.recv_timeout(config.response_timeout) {
            Ok(ConnectSignal::Ok) => {
                info!("KNX tunnel connected, channel {}", self.inner.client.lock().channel_id());
                self.start_heartbeat();
                Ok(())
            }
            Ok(ConnectSignal::Failed(status)) => {
                warn!("connect request rejected, status 0x{status:02x}");
                Err(KnxError::protocol_error(status))
            }
            Err(_) => {
                warn!("KNX gateway did not respond to connect request");
                self.stop_receiver();
                Err(KnxError::Timeout)
            }
        }
    }

    /// Disconnect the tunnel; safe to call multiple times
    pub fn disconnect(&self) {
        let is_connected = self.is_connected();
        if is_connected {
            debug!("disconnecting KNX tunnel");
            if let Ok(frame) = self.inner.client.lock().build_disconnect_request().map(<[u8]>::to_vec) {
                let _ignored = self.send_raw(&frame);
            }
        } else {
            debug!("disconnect() - no connection, nothing to do");
        }

        self.inner.client.lock().reset();
        self.stop_heartbeat();
        self.stop_receiver();
        *self.inner.socket.lock() = None;
    }

    /// Send a group write to `addr`
    ///
    /// Does not validate that the address exists on the bus.
    pub fn group_write(&self, addr: GroupAddress, data: &[u8]) -> Result<()> {
        self.ensure_connected()?;
        let source = local_source();
        let mut cemi_buf = [0u8; 32];
        let cemi_len = LDataRequest::group_write(source, addr, data).build(&mut cemi_buf)?;
        self.send_tunneling_request(&cemi_buf[..cemi_len])
    }

    /// Read the value of `addr`, consulting the cache first unless
    /// `use_cache` is `false`
    ///
    /// Returns `None` on a cache miss with no gateway response within
    /// `timeout`.
    pub fn group_read(&self, addr: GroupAddress, use_cache: bool, timeout: Duration) -> Result<Option<Vec<u8>>> {
        if use_cache {
            if let Some(cached) = self.inner.cache.get(addr) {
                debug!("group_read({addr}) served from cache");
                return Ok(Some(cached));
            }
        }

        self.ensure_connected()?;
        self.inner.channels.drain_results();

        let source = local_source();
        let mut cemi_buf = [0u8; 32];
        let cemi_len = LDataRequest::group_read(source, addr).build(&mut cemi_buf)?;
        self.send_tunneling_request(&cemi_buf[..cemi_len])?;

        match self.inner.channels.result_rx.recv_timeout(timeout) {
            Ok(payload) => Ok(Some(payload)),
            Err(_) => Ok(None),
        }
    }

    /// Toggle a 1-byte group address: `[0]` becomes `[1]` and vice versa
    ///
    /// # Errors
    ///
    /// Returns `BadOperation` if the current value is not exactly one byte
    /// of `0` or `1`.
    pub fn group_toggle(&self, addr: GroupAddress, use_cache: bool) -> Result<()> {
        let current = self
            .group_read(addr, use_cache, Duration::from_secs(1))?
            .ok_or_else(|| KnxError::bad_operation(format!("no value for {addr} to toggle")))?;

        match current.as_slice() {
            [0] => self.group_write(addr, &[1]),
            [1] => self.group_write(addr, &[0]),
            other => Err(KnxError::bad_operation(format!(
                "can't toggle {addr}, value {other:?} is not a single 0/1 byte"
            ))),
        }
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.is_connected() {
            Ok(())
        } else {
            self.connect()
        }
    }

    /// Send a cEMI payload wrapped in a TUNNELING_REQUEST, waiting for the
    /// ACK with one retransmit, reconnecting on total failure
    fn send_tunneling_request(&self, cemi_data: &[u8]) -> Result<()> {
        let _send_guard = self.inner.send_lock.lock();

        while self.inner.channels.ack_rx.try_recv().is_ok() {}

        let frame = {
            let mut client = self.inner.client.lock();
            client.build_tunneling_request(cemi_data)?.to_vec()
        };

        self.send_raw(&frame)?;
        if self.inner.channels.ack_rx.recv_timeout(Duration::from_secs(1)).is_ok() {
            return Ok(());
        }

        warn!("no TUNNELING_ACK within 1s, retransmitting");
        self.send_raw(&frame)?;
        if self.inner.channels.ack_rx.recv_timeout(Duration::from_secs(1)).is_ok() {
            return Ok(());
        }

        error!("TUNNELING_ACK missing after retry, reconnecting");
        self.disconnect();
        self.connect()?;
        Err(KnxError::Timeout)
    }

    fn send_raw(&self, frame: &[u8]) -> Result<()> {
        let guard = self.inner.socket.lock();
        let socket = guard.as_ref().ok_or(KnxError::NotConnected)?;
        socket.send(frame)?;
        Ok(())
    }

    fn start_receiver(&self, socket: UdpSocket) {
        self.inner.running.store(true, Ordering::SeqCst);
        let inner = Arc::clone(&self.inner);
        let handle = thread::spawn(move || receiver_loop(&inner, &socket));
        *self.inner.receiver_thread.lock() = Some(handle);
    }

    fn stop_receiver(&self) {
        self.inner.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.inner.receiver_thread.lock().take() {
            let _ignored = handle.join();
        }
    }

    fn start_heartbeat(&self) {
        let inner = Arc::clone(&self.inner);
        let session = self.clone();
        let handle = thread::spawn(move || heartbeat_loop(&inner, &session));
        *self.inner.heartbeat_thread.lock() = Some(handle);
    }

    fn stop_heartbeat(&self) {
        if let Some(handle) = self.inner.heartbeat_thread.lock().take() {
            let _ignored = handle.join();
        }
    }
}

/// Source address used for locally originated group telegrams
///
/// The gateway fills in the real physical address; the client leaves it
/// unset (0.0.0).
fn local_source() -> IndividualAddress {
    IndividualAddress::from(0u16)
}

fn receiver_loop(inner: &Arc<Inner>, socket: &UdpSocket) {
    let mut buf = [0u8; 512];
    while inner.running.load(Ordering::SeqCst) {
        let len = match socket.recv(&mut buf) {
            Ok(len) => len,
            Err(e) if matches!(e.kind(), std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut) => continue,
            Err(e) => {
                error!("KNX tunnel receiver socket error: {e}");
                break;
            }
        };

        if let Err(e) = dispatch(inner, &buf[..len]) {
            warn!("dropping malformed frame from gateway: {e}");
        }
    }
}

fn dispatch(inner: &Arc<Inner>, data: &[u8]) -> Result<()> {
    let frame = KnxnetIpFrame::parse(data)?;
    let body = frame.body();

    match frame.service_type() {
        ServiceType::ConnectResponse => {
            let result = inner.client.lock().handle_connect_response(body);
            let signal = match result {
                Ok(()) => ConnectSignal::Ok,
                Err(KnxError::ProtocolError { status }) => ConnectSignal::Failed(status),
                Err(e) => return Err(e),
            };
            let _ignored = inner.channels.connect_tx.try_send(signal);
        }
        ServiceType::ConnectionstateResponse => {
            let status = body.get(1).copied().unwrap_or(0xFF);
            let _ignored = inner.channels.conn_state_tx.try_send(status);
        }
        ServiceType::DisconnectResponse => {
            debug!("gateway confirmed disconnect");
            inner.client.lock().reset();
        }
        ServiceType::TunnellingRequest => handle_tunneling_request(inner, body)?,
        ServiceType::TunnellingAck => {
            inner.client.lock().handle_tunneling_ack(body)?;
            let _ignored = inner.channels.ack_tx.try_send(());
        }
        other => debug!("ignoring unhandled service type {other:?}"),
    }

    Ok(())
}

fn handle_tunneling_request(inner: &Arc<Inner>, body: &[u8]) -> Result<()> {
    let header = ConnectionHeader::decode(body)?;
    let cemi_data = inner.client.lock().handle_tunneling_request(body)?;

    let cemi = match CEMIFrame::parse(cemi_data) {
        Ok(cemi) => cemi,
        Err(e) => {
            warn!("dropping unparsable cEMI payload: {e}");
            return Ok(());
        }
    };

    let known_code = matches!(cemi.message_code(), CEMIMessageCode::LDataInd | CEMIMessageCode::LDataCon);
    if !known_code {
        debug!("ignoring cEMI message code {:?}", cemi.message_code());
        return Ok(());
    }

    if let Ok(ldata) = cemi.as_ldata() {
        if ldata.is_group_write() || ldata.is_group_response() {
            if let Some(addr) = ldata.destination_group() {
                let value = ldata.value();
                inner.cache.set(addr, &value);
                if let Some(notify) = inner.notify.lock().as_ref() {
                    notify(addr, &value);
                }
                inner.listeners.dispatch(addr, &value);

                if ldata.is_group_response() {
                    let _ignored = inner.channels.result_tx.try_send(value);
                }
            }
        }
    }

    let ack_frame = {
        let mut client = inner.client.lock();
        client.build_tunneling_ack(header.sequence_counter, E_NO_ERROR)?.to_vec()
    };
    if let Some(socket) = inner.socket.lock().as_ref() {
        socket.send(&ack_frame)?;
    }

    Ok(())
}

/// Background heartbeat: every 60s while connected, send up to
/// `heartbeat_retries` `CONNECTIONSTATE_REQUEST`s with a 10s response
/// timeout each. Disconnects only after every retry in a round fails.
fn heartbeat_loop(inner: &Arc<Inner>, session: &TunnelSession) {
    loop {
        thread::sleep(inner.config.lock().heartbeat_interval);
        if !inner.running.load(Ordering::SeqCst) {
            return;
        }
        if !session.is_connected() {
            return;
        }

        let retries = inner.config.lock().heartbeat_retries;
        let mut healthy = false;

        for attempt in 1..=retries {
            debug!("heartbeat: sending CONNECTIONSTATE_REQUEST ({attempt}/{retries})");
            while inner.channels.conn_state_rx.try_recv().is_ok() {}

            let frame = match inner.client.lock().build_connectionstate_request() {
                Ok(frame) => frame.to_vec(),
                Err(e) => {
                    error!("heartbeat: failed to build request: {e}");
                    continue;
                }
            };
            if session.send_raw(&frame).is_err() {
                continue;
            }

            match inner.channels.conn_state_rx.recv_timeout(Duration::from_secs(10)) {
                Ok(E_NO_ERROR) => {
                    debug!("heartbeat: healthy");
                    healthy = true;
                    break;
                }
                Ok(status @ (E_CONNECTION_ID | E_DATA_CONNECTION | E_KNX_CONNECTION)) => {
                    warn!("heartbeat: gateway reported error 0x{status:02x}");
                }
                Ok(status) => warn!("heartbeat: unexpected status 0x{status:02x}"),
                Err(_) => warn!("heartbeat: no response, retry {attempt}/{retries}"),
            }
        }

        if !healthy {
            error!("heartbeat: connection unhealthy after {retries} retries, disconnecting");
            session.disconnect();
            return;
        }
    }
}
