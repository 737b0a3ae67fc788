//! Poll-driven HTTP service over the modem engine.
//!
//! The service owns the engine and consumes it only through its narrow
//! interface: classified events in, payload bytes and close commands out.
//! Request payloads alias the engine's shared buffer, so everything the
//! caller may need later (the query string) is copied out before the next
//! engine call.

use log::{debug, info, warn};

use atmodem_engine::{Channel, InboundEvent, Modem, NullReset, ResetControl, Transport};

use crate::error::{HttpError, HttpResult};
use crate::request::RequestLine;
use crate::response::{html_response, not_found_page, ok_page};
use crate::router::{HttpMethod, RouteId, Router};

/// A request that matched a registered route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServedRequest {
    /// Session slot the request arrived on; answer and close it when done.
    pub channel: Channel,
    /// The matched route.
    pub route: RouteId,
    /// Query string copied out of the request, e.g. `on=1&level=5`.
    pub query: Option<String>,
}

/// What one poll decided to do, with every borrow of the engine released.
enum Action {
    Idle,
    Diagnose,
    Drop(Channel),
    NotFound(Channel),
    Hit(Channel, RouteId, Option<String>),
}

/// HTTP front end for one modem.
pub struct HttpService<T: Transport, R: ResetControl = NullReset> {
    modem: Modem<T, R>,
    router: Router,
}

impl<T: Transport, R: ResetControl> HttpService<T, R> {
    /// Wrap an engine. Routes are registered afterwards via [`Self::router_mut`].
    pub fn new(modem: Modem<T, R>) -> HttpService<T, R> {
        HttpService {
            modem,
            router: Router::new(),
        }
    }

    /// The route table.
    pub fn router_mut(&mut self) -> &mut Router {
        &mut self.router
    }

    /// The underlying engine, e.g. for status queries.
    pub fn modem_mut(&mut self) -> &mut Modem<T, R> {
        &mut self.modem
    }

    /// Register a route.
    pub fn register(&mut self, method: HttpMethod, path: &str) -> RouteId {
        self.router.register(method, path)
    }

    /// Bring the modem into serving state: initialize, join the access
    /// point, start the TCP server. Each step's failure is distinguished so
    /// the host can report what broke.
    pub fn start(&mut self, ssid: &str, pass: &str, port: u16) -> HttpResult<()> {
        self.modem.init().map_err(HttpError::Init)?;
        self.modem.join(ssid, pass).map_err(HttpError::Join)?;
        self.modem.start_server(port).map_err(HttpError::Serve)?;
        Ok(())
    }

    /// Handle the next engine event, if any.
    ///
    /// Unregistered routes are answered with the 404 page and closed;
    /// payloads that are not HTTP are closed without an answer; requests
    /// matching a registered route are returned for the caller to act on and
    /// answer (e.g. with [`Self::respond_ok`]).
    pub fn poll(&mut self) -> HttpResult<Option<ServedRequest>> {
        let action = match self.modem.poll()? {
            InboundEvent::Nothing => Action::Idle,
            InboundEvent::ClientConnected { channel } => {
                debug!("channel {} connected", channel);
                Action::Idle
            }
            InboundEvent::ClientDisconnected { channel } => {
                debug!("channel {} disconnected", channel);
                Action::Idle
            }
            InboundEvent::ReplyPending => Action::Diagnose,
            InboundEvent::Data(frame) => {
                if frame.truncated {
                    warn!("truncated request on channel {}, dropping", frame.channel);
                    Action::Drop(frame.channel)
                } else {
                    match RequestLine::parse(frame.payload) {
                        Ok(line) => match self.router.lookup_token(line.method, line.path) {
                            Some(route) => Action::Hit(
                                frame.channel,
                                route,
                                line.query.map(str::to_string),
                            ),
                            None => Action::NotFound(frame.channel),
                        },
                        Err(HttpError::NotHttp) => Action::Drop(frame.channel),
                        Err(err) => {
                            warn!("unparseable request on channel {}: {}", frame.channel, err);
                            Action::Drop(frame.channel)
                        }
                    }
                }
            }
        };

        match action {
            Action::Idle => Ok(None),
            Action::Diagnose => {
                if self.modem.diagnose()? {
                    debug!("stray line was harmless");
                } else {
                    info!("modem service re-established after restart");
                }
                Ok(None)
            }
            Action::Drop(channel) => {
                self.close_quietly(channel);
                Ok(None)
            }
            Action::NotFound(channel) => {
                self.modem
                    .send_preformatted(channel, not_found_page().as_bytes())?;
                self.close_quietly(channel);
                Ok(None)
            }
            Action::Hit(channel, route, query) => Ok(Some(ServedRequest {
                channel,
                route,
                query,
            })),
        }
    }

    /// Answer a served request with the generic success page and close the
    /// session.
    pub fn respond_ok(&mut self, channel: Channel) -> HttpResult<()> {
        self.modem.send_preformatted(channel, ok_page().as_bytes())?;
        self.close_quietly(channel);
        Ok(())
    }

    /// Answer a served request with a custom HTML body and close the session.
    pub fn respond(&mut self, channel: Channel, status: &str, body: &str) -> HttpResult<()> {
        self.modem
            .send_preformatted(channel, html_response(status, body).as_bytes())?;
        self.close_quietly(channel);
        Ok(())
    }

    /// Close a session, tolerating close-handshake noise; the disconnect
    /// notification is picked up by a later poll either way.
    fn close_quietly(&mut self, channel: Channel) {
        if let Err(err) = self.modem.close(channel) {
            warn!("close of channel {} did not complete cleanly: {}", channel, err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atmodem_engine::MockTransport;

    const BRINGUP: &[u8] = b"ready\r\nOK\r\nOK\r\nOK\r\nOK\r\nOK\r\n";
    const SEND_REPLY: &[u8] = b"OK\r\nSEND OK\r\n";

    fn close_script(channel: u8) -> Vec<u8> {
        format!(
            "AT+CIPCLOSE={ch}\r\r\n{ch},CLOSED\r\nOK\r\n",
            ch = channel as char
        )
        .into_bytes()
    }

    fn started_service() -> HttpService<MockTransport> {
        let mut mock = MockTransport::new();
        mock.push_input(BRINGUP);
        let mut service = HttpService::new(Modem::new(mock));
        service.start("lab-net", "hunter2", 80).unwrap();
        service
    }

    #[test]
    fn test_registered_route_is_served() {
        let mut service = started_service();
        let status = service.register(HttpMethod::Get, "/status");

        let transport = service.modem_mut().transport_mut();
        transport.push_input(b"0,CONNECT\r\n");
        transport.push_input(b"+IPD,0,20:GET /status HTTP/1.1\r\n");

        assert_eq!(service.poll().unwrap(), None); // connect event
        let request = service.poll().unwrap().expect("request");
        assert_eq!(request.route, status);
        assert_eq!(request.query, None);

        let transport = service.modem_mut().transport_mut();
        transport.push_input(SEND_REPLY);
        transport.push_input(&close_script(b'0'));
        service.respond_ok(request.channel).unwrap();

        let written = service.modem_mut().transport_mut().take_written();
        let text = String::from_utf8(written).unwrap();
        assert!(text.contains("HTTP/1.1 200 OK"));
        assert!(text.contains("AT+CIPCLOSE=0"));
    }

    #[test]
    fn test_query_is_copied_out() {
        let mut service = started_service();
        service.register(HttpMethod::Get, "/led");

        let transport = service.modem_mut().transport_mut();
        transport.push_input(b"+IPD,1,22:GET /led?on=1 HTTP/1.1\r\n");

        let request = service.poll().unwrap().expect("request");
        assert_eq!(request.query.as_deref(), Some("on=1"));
        assert_eq!(request.channel, Channel::new(1).unwrap());
    }

    #[test]
    fn test_unregistered_route_gets_404() {
        let mut service = started_service();
        service.register(HttpMethod::Get, "/status");

        let transport = service.modem_mut().transport_mut();
        transport.push_input(b"+IPD,0,18:GET /nope HTTP/1.1\r\n");
        transport.push_input(SEND_REPLY);
        transport.push_input(&close_script(b'0'));

        assert_eq!(service.poll().unwrap(), None);

        let written = service.modem_mut().transport_mut().take_written();
        let text = String::from_utf8(written).unwrap();
        assert!(text.contains("404 NOT FOUND"));
        assert!(text.contains("AT+CIPCLOSE=0"));
    }

    #[test]
    fn test_raw_tcp_payload_is_closed_without_answer() {
        let mut service = started_service();

        let transport = service.modem_mut().transport_mut();
        transport.push_input(b"+IPD,2,5:hello\r\n");
        transport.push_input(&close_script(b'2'));

        assert_eq!(service.poll().unwrap(), None);

        let written = service.modem_mut().transport_mut().take_written();
        let text = String::from_utf8(written).unwrap();
        assert!(!text.contains("HTTP/1.1"));
        assert!(text.contains("AT+CIPCLOSE=2"));
    }

    #[test]
    fn test_bringup_failures_are_distinguished() {
        let mut mock = MockTransport::new();
        mock.push_input(b"ready\r\nOK\r\nOK\r\nOK\r\nFAIL\r\n");
        let mut service = HttpService::new(Modem::new(mock));
        let err = service.start("lab-net", "wrong", 80).unwrap_err();
        assert!(matches!(err, HttpError::Join(_)));
    }
}
