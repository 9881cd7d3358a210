//! End-to-end runs of the hub over loopback TCP.
#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio::time::timeout;

use meshsignal::client::{Client, SignalingClient};
use meshsignal::connection::{Assembled, FrameAssembler};
use meshsignal::hub::{Hub, Listener, run_hub};
use meshsignal::log::{LogSink, NoopLogSink};
use meshsignal::participant::{MediaConfig, NegotiatingFactory, SessionCodecs};
use meshsignal::protocol::candidate::COMPONENT_RTP;
use meshsignal::protocol::{
    Candidate, Codec, Frame, HUB_ID, MediaType, MsgType, ParticipantId,
};

const WAIT: Duration = Duration::from_secs(5);

fn noop() -> Arc<dyn LogSink> {
    Arc::new(NoopLogSink)
}

fn audio() -> Vec<MediaConfig> {
    vec![MediaConfig {
        media: MediaType::Audio.as_u32(),
        codecs: vec![Codec::new(0, "PCMU", MediaType::Audio, 8000).with_channels(1)],
        candidates: Vec::new(),
    }]
}

/// Start a hub on an ephemeral port; returns the port and the hub task.
fn start_hub(media: Vec<MediaConfig>) -> (u16, JoinHandle<std::io::Result<()>>) {
    let listener = Listener::bind("127.0.0.1", 0).unwrap();
    let port = listener.local_port();
    let hub = Hub::new("hub", Box::new(NegotiatingFactory::new(media, noop())), noop());
    (port, tokio::spawn(run_hub(listener, hub, noop())))
}

/// A peer speaking raw frames, for checking exactly what the hub sends.
struct RawPeer {
    stream: TcpStream,
    asm: FrameAssembler,
}

impl RawPeer {
    async fn connect(port: u16) -> Self {
        Self {
            stream: TcpStream::connect(("127.0.0.1", port)).await.unwrap(),
            asm: FrameAssembler::new(),
        }
    }

    async fn send(&mut self, frame: &Frame) {
        self.stream.write_all(&frame.encode().unwrap()).await.unwrap();
    }

    async fn introduce(&mut self, name: &str) -> ParticipantId {
        self.send(&Frame::new(0, HUB_ID, MsgType::Intro, 0, Bytes::from(name.to_owned())))
            .await;
        let welcome = self.recv().await;
        assert_eq!(welcome.msg_type, MsgType::Intro);
        assert_eq!(welcome.src, HUB_ID);
        welcome.dest
    }

    async fn recv(&mut self) -> Frame {
        self.recv_within(WAIT).await.expect("frame in time")
    }

    /// Next frame, or `None` when nothing arrives within `wait`.
    async fn recv_within(&mut self, wait: Duration) -> Option<Frame> {
        timeout(wait, async {
            let mut buf = [0u8; 512];
            loop {
                let want = self.asm.bytes_needed().min(buf.len());
                let n = self.stream.read(&mut buf[..want]).await.unwrap();
                assert!(n > 0, "hub closed the connection");
                match self.asm.push(&buf[..n]).unwrap() {
                    (_, Assembled::Frame(f)) => return f,
                    (_, Assembled::Pending) => {}
                    (_, Assembled::Rejected(e)) => panic!("hub sent a bad frame: {e}"),
                }
            }
        })
        .await
        .ok()
    }

    /// Everything that arrives until the hub has been quiet for `quiet`.
    async fn drain(&mut self, quiet: Duration) -> Vec<Frame> {
        let mut frames = Vec::new();
        while let Some(f) = self.recv_within(quiet).await {
            frames.push(f);
        }
        frames
    }

    /// Skip the hub's own negotiation traffic until a frame of `kind` shows up.
    async fn recv_kind(&mut self, kind: MsgType) -> Frame {
        loop {
            let f = self.recv().await;
            if f.msg_type == kind {
                return f;
            }
        }
    }

    /// Assert nothing arrives for a short while.
    async fn expect_silence(&mut self) {
        let mut byte = [0u8; 1];
        let res = timeout(Duration::from_millis(200), self.stream.read(&mut byte)).await;
        assert!(res.is_err(), "unexpected data from the hub");
    }
}

#[tokio::test]
async fn alice_then_bob() {
    let (port, hub) = start_hub(audio());

    let mut alice = RawPeer::connect(port).await;
    assert_eq!(alice.introduce("alice").await, 2);
    // The hub's handler for alice starts the exchange right away.
    assert_eq!(alice.recv().await.msg_type, MsgType::CandidatesDone);
    let codec = alice.recv().await;
    assert_eq!((codec.msg_type, codec.src, codec.dest), (MsgType::Codec, HUB_ID, 2));
    assert_eq!(alice.recv().await.msg_type, MsgType::CodecsDone);

    let mut bob = RawPeer::connect(port).await;
    assert_eq!(bob.introduce("bob").await, 3);

    let about_bob = alice.recv().await;
    assert_eq!(about_bob.msg_type, MsgType::Intro);
    assert_eq!((about_bob.src, about_bob.dest), (3, 2));
    assert_eq!(&about_bob.payload[..], b"bob");

    // Alice answers; bob learns about her through the relay.
    alice
        .send(&Frame::new(2, 3, MsgType::Intro, 0, Bytes::from_static(b"alice")))
        .await;
    let about_alice = bob.recv_kind(MsgType::Intro).await;
    assert_eq!((about_alice.src, about_alice.dest), (2, 3));
    assert_eq!(&about_alice.payload[..], b"alice");

    hub.abort();
}

#[tokio::test]
async fn ids_are_sequential_from_two() {
    let (port, hub) = start_hub(Vec::new());
    let mut peers = Vec::new();
    for n in 0..5u32 {
        let mut p = RawPeer::connect(port).await;
        assert_eq!(p.introduce(&format!("p{n}")).await, n + 2);
        peers.push(p);
    }

    // The last one was announced to the four before it, once each.
    for (i, p) in peers.iter_mut().take(4).enumerate() {
        for later in (i as u32 + 3)..=6 {
            let f = p.recv().await;
            assert_eq!((f.msg_type, f.src), (MsgType::Intro, later));
        }
        p.expect_silence().await;
    }
    hub.abort();
}

#[tokio::test]
async fn candidate_relay_is_byte_identical() {
    let (port, hub) = start_hub(Vec::new());
    let mut peers = Vec::new();
    for n in 0..6 {
        let mut p = RawPeer::connect(port).await;
        p.introduce(&format!("p{n}")).await;
        peers.push(p);
    }
    // Drain the announcements everyone got.
    for (i, p) in peers.iter_mut().enumerate() {
        for _ in i + 1..6 {
            p.recv_kind(MsgType::Intro).await;
        }
    }

    let payload = Candidate::host("L1", COMPONENT_RTP, "192.168.0.5", 5004)
        .encode()
        .unwrap();
    let sent = Frame::new(5, 7, MsgType::Candidate, 1, Bytes::from(payload));
    peers[3].send(&sent).await;

    assert_eq!(peers[5].recv().await, sent);
    hub.abort();
}

#[tokio::test]
async fn violations_and_departures_leave_the_hub_running() {
    let (port, hub) = start_hub(Vec::new());
    let mut a = RawPeer::connect(port).await;
    let mut b = RawPeer::connect(port).await;
    assert_eq!(a.introduce("a").await, 2);
    assert_eq!(b.introduce("b").await, 3);
    a.recv_kind(MsgType::Intro).await;

    // Unknown destination and a spoofed source are dropped, the session stays.
    a.send(&Frame::new(2, 42, MsgType::CandidatesDone, 0, Bytes::new())).await;
    a.send(&Frame::new(3, 3, MsgType::CandidatesDone, 0, Bytes::new())).await;
    b.expect_silence().await;
    let ok = Frame::new(2, 3, MsgType::CandidatesDone, 0, Bytes::new());
    a.send(&ok).await;
    assert_eq!(b.recv().await, ok);

    // A corrupted stream only costs its own session.
    let mut bad = RawPeer::connect(port).await;
    bad.stream.write_all(&[0u8; 24]).await.unwrap();

    drop(a);
    let mut c = RawPeer::connect(port).await;
    assert_eq!(c.introduce("c").await, 4);
    // Only b is still there to hear about c; a left silently.
    let f = b.recv().await;
    assert_eq!((f.msg_type, f.src), (MsgType::Intro, 4));
    hub.abort();
}

#[tokio::test]
async fn busy_port_moves_up_and_still_serves() {
    let squatter = std::net::TcpListener::bind(("127.0.0.1", 0)).unwrap();
    let taken = squatter.local_addr().unwrap().port();

    let listener = Listener::bind("127.0.0.1", taken).unwrap();
    let port = listener.local_port();
    assert!(port > taken);
    let hub = tokio::spawn(run_hub(
        listener,
        Hub::new("hub", Box::new(NegotiatingFactory::new(Vec::new(), noop())), noop()),
        noop(),
    ));

    let mut p = RawPeer::connect(port).await;
    assert_eq!(p.introduce("late").await, 2);
    hub.abort();
}

async fn step_until(sc: &mut SignalingClient, want: &[ParticipantId]) {
    timeout(WAIT, async {
        while sc.client().directory().ids() != want {
            sc.step().await.unwrap();
        }
    })
    .await
    .expect("directory complete in time");
}

#[tokio::test]
async fn two_clients_meet_through_the_hub() {
    let (port, hub) = start_hub(audio());
    let peer = |name: &str| {
        Client::new(name, Box::new(NegotiatingFactory::new(audio(), noop())), noop())
    };

    let mut alice = SignalingClient::connect("127.0.0.1", port, peer("alice"), noop())
        .await
        .unwrap();
    step_until(&mut alice, &[HUB_ID]).await;
    assert_eq!(alice.local_id(), 2);

    let bob = SignalingClient::connect("127.0.0.1", port, peer("bob"), noop())
        .await
        .unwrap();

    let alice_task = tokio::spawn(async move {
        step_until(&mut alice, &[HUB_ID, 3]).await;
        alice
    });
    let bob_task = tokio::spawn(async move {
        let mut bob = bob;
        step_until(&mut bob, &[HUB_ID, 2]).await;
        bob
    });

    let alice = alice_task.await.unwrap();
    let bob = bob_task.await.unwrap();
    assert_eq!(bob.local_id(), 3);
    assert_eq!(alice.client().directory().name(3), Some("bob"));
    assert_eq!(bob.client().directory().name(2), Some("alice"));
    hub.abort();
}

/// Step `sc` until `done` holds for its state.
async fn step_while_not<F>(sc: &mut SignalingClient, done: F)
where
    F: Fn(&SignalingClient) -> bool,
{
    timeout(WAIT, async {
        while !done(&*sc) {
            sc.step().await.unwrap();
        }
    })
    .await
    .expect("condition reached in time");
}

fn every_id_but(own: ParticipantId, last: ParticipantId) -> Vec<ParticipantId> {
    (HUB_ID..=last).filter(|id| *id != own).collect()
}

/// Join a real client and keep it serving until its directory holds every
/// id up to `last`.
async fn join_and_serve(
    port: u16,
    name: &str,
    last: ParticipantId,
) -> (ParticipantId, JoinHandle<SignalingClient>) {
    let client = Client::new(name, Box::new(NegotiatingFactory::new(audio(), noop())), noop());
    let mut sc = SignalingClient::connect("127.0.0.1", port, client, noop())
        .await
        .unwrap();
    step_while_not(&mut sc, |sc| sc.client().is_welcomed()).await;
    let id = sc.local_id();
    let task = tokio::spawn(async move {
        let want = every_id_but(sc.local_id(), last);
        step_until(&mut sc, &want).await;
        sc
    });
    (id, task)
}

#[tokio::test]
async fn newcomer_hears_about_each_earlier_peer_exactly_once() {
    let (port, hub) = start_hub(audio());

    // Three real clients, then a raw newcomer counting what it is told,
    // then a fourth real client. Ids 2, 3, 4, then 5, then 6.
    let mut serving = Vec::new();
    for (n, name) in ["alice", "bob", "carol"].into_iter().enumerate() {
        let (id, task) = join_and_serve(port, name, 6).await;
        assert_eq!(id, n as u32 + 2);
        serving.push(task);
    }

    let mut dave = RawPeer::connect(port).await;
    assert_eq!(dave.introduce("dave").await, 5);
    let mut intros: BTreeMap<ParticipantId, usize> = BTreeMap::new();
    for f in dave.drain(Duration::from_millis(500)).await {
        if f.msg_type == MsgType::Intro {
            assert_eq!(f.dest, 5);
            *intros.entry(f.src).or_default() += 1;
        }
    }
    assert_eq!(intros, BTreeMap::from([(2, 1), (3, 1), (4, 1)]));

    let (erin_id, erin) = join_and_serve(port, "erin", 6).await;
    assert_eq!(erin_id, 6);
    serving.push(erin);

    // Dave hears about erin once, from the hub's announcement, and answers
    // the way a client would.
    let about_erin = dave
        .drain(Duration::from_millis(500))
        .await
        .into_iter()
        .filter(|f| f.msg_type == MsgType::Intro)
        .collect::<Vec<_>>();
    assert_eq!(about_erin.len(), 1);
    assert_eq!((about_erin[0].src, about_erin[0].dest), (6, 5));
    dave.send(&Frame::new(5, 6, MsgType::Intro, 0, Bytes::from_static(b"dave")))
        .await;

    for task in serving {
        let sc = task.await.unwrap();
        assert_eq!(
            sc.client().directory().ids(),
            every_id_but(sc.local_id(), 6)
        );
    }
    hub.abort();
}

#[tokio::test]
async fn peer_pairs_reach_ready_with_the_session_codecs() {
    let (port, hub) = start_hub(audio());
    let with_candidate = |ip: &str| {
        let mut media = audio();
        media[0].candidates = vec![Candidate::host("L1", COMPONENT_RTP, ip, 7078)];
        NegotiatingFactory::new(media, noop())
    };
    let alice_factory = with_candidate("10.0.0.2");
    let bob_factory = with_candidate("10.0.0.3");
    let alice_session: SessionCodecs = alice_factory.session().clone();
    let bob_session: SessionCodecs = bob_factory.session().clone();

    let mut alice = SignalingClient::connect(
        "127.0.0.1",
        port,
        Client::new("alice", Box::new(alice_factory), noop()),
        noop(),
    )
    .await
    .unwrap();
    step_until(&mut alice, &[HUB_ID]).await;
    let mut bob = SignalingClient::connect(
        "127.0.0.1",
        port,
        Client::new("bob", Box::new(bob_factory), noop()),
        noop(),
    )
    .await
    .unwrap();

    let alice_task = tokio::spawn(async move {
        let session = alice_session.clone();
        step_while_not(&mut alice, move |_| session.ready_participants() == [HUB_ID, 3]).await;
        alice_session
    });
    let bob_task = tokio::spawn(async move {
        let session = bob_session.clone();
        step_while_not(&mut bob, move |_| session.ready_participants() == [HUB_ID, 2]).await;
        bob_session
    });

    let alice_session = alice_task.await.unwrap();
    let bob_session = bob_task.await.unwrap();
    let pcmu = Codec::new(0, "PCMU", MediaType::Audio, 8000).with_channels(1);
    assert_eq!(alice_session.negotiated(MediaType::Audio.as_u32()), vec![pcmu.clone()]);
    assert_eq!(bob_session.negotiated(MediaType::Audio.as_u32()), vec![pcmu]);
    hub.abort();
}
