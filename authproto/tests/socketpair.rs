//! Exercises the blocking framed channel over a real `UnixStream` pair, the
//! way the helper and broker actually talk to each other (a pipe, not an
//! in-memory buffer) — an in-process stand-in for a real peer process that
//! drives the wire protocol end to end.

use std::os::unix::net::UnixStream;
use std::thread;

use authproto::message::FramedMessage;
use authproto::sync::Framed;

#[test]
fn one_request_one_reply_round_trips_over_a_real_pipe() {
    let (left, right) = UnixStream::pair().expect("socketpair");

    let helper = thread::spawn(move || {
        let mut chan = Framed::new(left);
        chan.send(&FramedMessage::RequestSessionId).unwrap();
        chan.receive().unwrap()
    });

    let mut broker_side = Framed::new(right);
    let req = broker_side.receive().unwrap();
    assert_eq!(req, FramedMessage::RequestSessionId);
    broker_side.send(&FramedMessage::SessionId { id: 7 }).unwrap();

    let reply = helper.join().unwrap();
    assert_eq!(reply, FramedMessage::SessionId { id: 7 });
}

#[test]
fn a_full_login_exchange_matches_the_documented_scenario() {
    let (left, right) = UnixStream::pair().expect("socketpair");

    let helper = thread::spawn(move || {
        let mut chan = Framed::new(left);
        chan.send(&FramedMessage::RequestEnv { user: "alice".into() }).unwrap();
        let env = chan.receive().unwrap();

        chan.send(&FramedMessage::RequestSessionId).unwrap();
        let id = chan.receive().unwrap();

        chan.send(&FramedMessage::RequestCookieLink {
            path: "/home/alice/.Xauthority".into(),
            user: "alice".into(),
        })
        .unwrap();
        let cookie = chan.receive().unwrap();

        chan.send(&FramedMessage::RequestDisplay).unwrap();
        let display = chan.receive().unwrap();

        chan.send(&FramedMessage::LoginSucceeded {
            session_name: "Session7".into(),
            user: "alice".into(),
        })
        .unwrap();

        (env, id, cookie, display)
    });

    let mut broker_side = Framed::new(right);

    assert_eq!(
        broker_side.receive().unwrap(),
        FramedMessage::RequestEnv { user: "alice".into() }
    );
    broker_side
        .send(&FramedMessage::Env {
            vars: vec!["HOME=/home/alice".into()],
        })
        .unwrap();

    assert_eq!(broker_side.receive().unwrap(), FramedMessage::RequestSessionId);
    broker_side.send(&FramedMessage::SessionId { id: 7 }).unwrap();

    assert_eq!(
        broker_side.receive().unwrap(),
        FramedMessage::RequestCookieLink {
            path: "/home/alice/.Xauthority".into(),
            user: "alice".into(),
        }
    );
    broker_side.send(&FramedMessage::CookieLink).unwrap();

    assert_eq!(broker_side.receive().unwrap(), FramedMessage::RequestDisplay);
    broker_side.send(&FramedMessage::Display { name: ":0".into() }).unwrap();

    assert_eq!(
        broker_side.receive().unwrap(),
        FramedMessage::LoginSucceeded {
            session_name: "Session7".into(),
            user: "alice".into(),
        }
    );

    let (env, id, cookie, display) = helper.join().unwrap();
    assert_eq!(env, FramedMessage::Env { vars: vec!["HOME=/home/alice".into()] });
    assert_eq!(id, FramedMessage::SessionId { id: 7 });
    assert_eq!(cookie, FramedMessage::CookieLink);
    assert_eq!(display, FramedMessage::Display { name: ":0".into() });
}
