//! Several clients driven through the real room store and router, with
//! delivery under the test's control.

use kurbo::Point;
use skync_core::{
    ClientMessage, CollaborationManager, Drawable, RoomEvent, SelectionError, ServerMessage,
};
use skync_server::room::PeerSender;
use skync_server::router::EventRouter;
use tokio::sync::mpsc::{self, UnboundedReceiver};

const ROOM: &str = "room";

struct Client {
    id: String,
    manager: CollaborationManager,
    tx: PeerSender,
    rx: UnboundedReceiver<ServerMessage>,
    /// Every event this client received from the relay, in order.
    received: Vec<ServerMessage>,
}

struct Harness {
    router: EventRouter,
    clients: Vec<Client>,
}

impl Harness {
    fn new(ids: &[&str]) -> Self {
        let mut harness = Self {
            router: EventRouter::default(),
            clients: Vec::new(),
        };
        for id in ids {
            harness.connect(id);
        }
        harness.settle();
        harness
    }

    fn connect(&mut self, id: &str) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut manager = CollaborationManager::new();
        manager.handle_server_message(ServerMessage::Connected {
            connection_id: id.to_string(),
        });
        manager.join_room(ROOM);
        self.clients.push(Client {
            id: id.to_string(),
            manager,
            tx,
            rx,
            received: Vec::new(),
        });
    }

    fn client(&mut self, index: usize) -> &mut CollaborationManager {
        &mut self.clients[index].manager
    }

    /// Send one client's queued frames to the relay without delivering anything.
    fn flush(&mut self, index: usize) {
        let client = &mut self.clients[index];
        for json in client.manager.take_outgoing() {
            let msg = ClientMessage::from_json(&json).unwrap();
            self.router.route(&client.id, &client.tx, msg);
        }
    }

    /// Hand one client everything the relay queued for it.
    fn deliver(&mut self, index: usize) {
        let client = &mut self.clients[index];
        while let Ok(msg) = client.rx.try_recv() {
            client.received.push(msg.clone());
            client.manager.handle_server_message(msg);
        }
    }

    /// Flush and deliver until no frames remain anywhere.
    fn settle(&mut self) {
        loop {
            let pending = self.clients.iter().any(|c| c.manager.has_outgoing() || !c.rx.is_empty());
            if !pending {
                break;
            }
            for i in 0..self.clients.len() {
                self.flush(i);
            }
            for i in 0..self.clients.len() {
                self.deliver(i);
            }
        }
    }

    fn drawables(&self, index: usize) -> Vec<Drawable> {
        self.clients[index].manager.drawables().to_vec()
    }

    fn assert_converged(&self) {
        let server = self.router.store().snapshot(ROOM).unwrap();
        for client in &self.clients {
            assert_eq!(client.manager.drawables(), server.as_slice(), "client {} diverged", client.id);
        }
    }

    fn received_kinds(&self, index: usize) -> Vec<&'static str> {
        self.clients[index]
            .received
            .iter()
            .filter_map(|msg| match msg {
                ServerMessage::Event { event, .. } => Some(event.name()),
                _ => None,
            })
            .collect()
    }
}

fn draw(manager: &mut CollaborationManager, points: &[(f64, f64)]) -> String {
    manager.begin_stroke(Point::new(points[0].0, points[0].1));
    for p in &points[1..] {
        manager.extend_stroke(Point::new(p.0, p.1));
    }
    manager.finish_stroke().unwrap()
}

#[test]
fn test_three_point_stroke_undo_redo() {
    let mut h = Harness::new(&["c1", "c2"]);
    let id = draw(h.client(0), &[(0.0, 0.0), (10.0, 5.0), (20.0, 0.0)]);
    h.settle();

    for i in 0..2 {
        let drawables = h.drawables(i);
        let stroke = drawables[0].as_stroke().unwrap();
        assert_eq!(stroke.id, id);
        assert_eq!(stroke.len(), 3);
        assert_eq!(stroke.owner_id, "c1");
    }
    assert!(h.clients[1].manager.live().is_empty());
    h.assert_converged();

    assert!(h.client(0).undo());
    h.settle();
    assert!(h.drawables(0).is_empty());
    assert!(h.drawables(1).is_empty());
    h.assert_converged();

    assert!(h.client(0).redo());
    h.settle();
    for i in 0..2 {
        let drawables = h.drawables(i);
        assert_eq!(drawables.len(), 1);
        let stroke = drawables[0].as_stroke().unwrap();
        assert_eq!(stroke.len(), 3);
        assert_eq!(stroke.owner_id, "c1");
    }
    h.assert_converged();
}

#[test]
fn test_sender_exclusion_per_kind() {
    let mut h = Harness::new(&["c1", "c2"]);
    draw(h.client(0), &[(0.0, 0.0), (10.0, 10.0)]);
    h.settle();

    assert_eq!(h.received_kinds(0), vec!["stroke-completed"]);
    assert_eq!(h.received_kinds(1), vec!["drawing", "stroke-completed"]);

    h.client(0).undo();
    h.client(0).redo();
    h.settle();
    assert_eq!(h.received_kinds(0), vec!["stroke-completed", "redo"]);
    assert_eq!(h.received_kinds(1), vec!["drawing", "stroke-completed", "undo", "redo"]);
    h.assert_converged();
}

#[test]
fn test_edits_converge() {
    let mut h = Harness::new(&["c1", "c2", "c3"]);
    let image = h.client(0).add_image("data:,x", 100.0, 100.0, Point::new(0.0, 0.0));
    h.settle();
    let stroke = draw(h.client(1), &[(300.0, 300.0), (320.0, 320.0), (340.0, 300.0)]);
    h.settle();
    h.assert_converged();

    // Drag the image, recolour the stroke, reorder, duplicate, delete.
    h.client(0).pointer_down(Point::new(50.0, 50.0)).unwrap();
    h.client(0).pointer_move(Point::new(80.0, 90.0));
    h.client(0).pointer_up();
    h.settle();
    h.assert_converged();

    h.client(1).select(&stroke).unwrap();
    assert!(h.client(1).change_selected_colour("#ff0000"));
    assert!(h.client(1).move_down());
    h.settle();
    h.assert_converged();
    assert_eq!(h.drawables(2)[0].id(), stroke);

    let copy = h.client(1).duplicate_selected().unwrap();
    h.settle();
    h.assert_converged();
    assert_eq!(h.drawables(2).len(), 3);

    h.client(0).select(&image).unwrap();
    assert!(h.client(0).delete_selected());
    h.settle();
    h.assert_converged();
    assert!(h.drawables(2).iter().all(|d| d.id() != image));

    // Undo everything the second client did, in reverse.
    while h.client(1).undo() {}
    h.settle();
    h.assert_converged();
    assert!(h.drawables(2).iter().all(|d| d.id() != copy));
}

#[test]
fn test_undo_of_delete_restores_everywhere() {
    let mut h = Harness::new(&["c1", "c2"]);
    let text = h
        .client(0)
        .add_text("hello", Point::new(10.0, 50.0), "#000000", 24.0, &skync_core::drawable::FallbackMeasure)
        .unwrap();
    h.settle();

    h.client(0).select(&text).unwrap();
    h.client(0).delete_selected();
    h.settle();
    assert!(h.drawables(1).is_empty());

    h.client(0).undo();
    h.settle();
    assert_eq!(h.drawables(1)[0].id(), text);
    h.assert_converged();
}

#[test]
fn test_selection_conflict() {
    let mut h = Harness::new(&["c1", "c2"]);
    let element = h.client(0).add_image("", 50.0, 50.0, Point::new(0.0, 0.0));
    h.client(0).deselect();
    h.settle();

    // Both select before either hears of the other: the race stands.
    h.client(0).select(&element).unwrap();
    h.client(1).select(&element).unwrap();
    h.flush(0);
    h.flush(1);
    assert_eq!(h.clients[0].manager.selected(), Some(element.as_str()));
    assert_eq!(h.clients[1].manager.selected(), Some(element.as_str()));

    h.deliver(0);
    h.deliver(1);

    // Once the peer's selection is known, a later attempt is refused locally.
    h.client(1).deselect();
    let err = h.client(1).select(&element).unwrap_err();
    assert!(matches!(err, SelectionError::LockedByPeer { ref peer, .. } if peer == "c1"));
    let err = h.client(1).pointer_down(Point::new(10.0, 10.0)).unwrap_err();
    assert!(matches!(err, SelectionError::LockedByPeer { .. }));
    assert!(h.clients[1].manager.selected().is_none());

    // The refusal sends nothing beyond the earlier deselect.
    let frames = h.client(1).take_outgoing();
    assert_eq!(frames.len(), 1);
    assert!(frames[0].contains("deselect-element"));
}

#[test]
fn test_disconnect_releases_lock() {
    let mut h = Harness::new(&["c1", "c2"]);
    let element = h.client(0).add_image("", 50.0, 50.0, Point::new(0.0, 0.0));
    h.client(0).select(&element).unwrap();
    h.settle();
    assert!(h.clients[1].manager.locks().is_locked(&element));

    h.router.disconnect(ROOM, "c1");
    h.deliver(1);
    assert!(!h.clients[1].manager.locks().is_locked(&element));
    assert!(h.client(1).select(&element).is_ok());
    assert_eq!(h.drawables(1).len(), 1);
}

#[test]
fn test_late_joiner_gets_snapshot() {
    let mut h = Harness::new(&["c1"]);
    draw(h.client(0), &[(0.0, 0.0), (5.0, 5.0), (10.0, 0.0)]);
    h.client(0).add_image("", 10.0, 10.0, Point::new(100.0, 100.0));
    h.settle();

    h.connect("c2");
    h.settle();
    assert_eq!(h.drawables(1).len(), 2);
    assert!(!h.clients[1].manager.replica().is_owned(h.drawables(1)[0].id()));
    h.assert_converged();
}

#[test]
fn test_layer_round_trip_and_hit_priority() {
    let mut h = Harness::new(&["c1", "c2"]);
    let below = h.client(0).add_image("", 100.0, 100.0, Point::new(0.0, 0.0));
    let above = h.client(0).add_image("", 200.0, 200.0, Point::new(-50.0, -50.0));
    h.client(0).deselect();
    h.settle();

    // A click on the overlap picks the top drawable, unless the lower one is selected.
    assert_eq!(h.client(1).select_at(Point::new(50.0, 50.0)).unwrap(), Some(above.clone()));
    h.client(1).select(&below).unwrap();
    assert_eq!(h.client(1).select_at(Point::new(50.0, 50.0)).unwrap(), Some(below.clone()));

    let before: Vec<String> = h.drawables(1).iter().map(|d| d.id().to_string()).collect();
    assert!(h.client(1).move_up());
    assert!(!h.client(1).move_up());
    assert!(h.client(1).move_down());
    h.settle();
    let after: Vec<String> = h.drawables(0).iter().map(|d| d.id().to_string()).collect();
    assert_eq!(before, after);
    h.assert_converged();
}

#[test]
fn test_unjoined_room_events_are_dropped() {
    let router = EventRouter::default();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let event = RoomEvent::DeleteElement { element_id: "x".to_string() };
    router.route("c1", &tx, ClientMessage::Emit { room_id: "nowhere".to_string(), event });
    assert!(rx.try_recv().is_err());
    assert_eq!(router.store().room_count(), 0);
}

#[test]
fn test_undo_redo_of_selected_element_releases_lock() {
    let mut h = Harness::new(&["c1", "c2"]);
    let element = h.client(0).add_image("", 50.0, 50.0, Point::new(0.0, 0.0));
    h.settle();
    assert_eq!(h.clients[1].manager.locks().holder(&element), Some("c1"));

    assert!(h.client(0).undo());
    assert!(h.client(0).redo());
    h.settle();
    h.assert_converged();
    assert!(h.clients[0].manager.selected().is_none());
    assert_eq!(h.clients[1].manager.locks().holder(&element), None);
    assert!(h.client(1).select(&element).is_ok());
}

#[test]
fn test_refused_grab_releases_previous_selection() {
    let mut h = Harness::new(&["c1", "c2", "c3"]);
    let a = h.client(0).add_image("", 50.0, 50.0, Point::new(0.0, 0.0));
    h.settle();
    h.client(1).add_image("", 50.0, 50.0, Point::new(500.0, 500.0));
    h.settle();
    assert_eq!(h.clients[0].manager.selected(), Some(a.as_str()));

    let err = h.client(0).pointer_down(Point::new(510.0, 510.0)).unwrap_err();
    assert!(matches!(err, SelectionError::LockedByPeer { ref peer, .. } if peer == "c2"));
    h.settle();

    assert!(h.clients[0].manager.selected().is_none());
    assert_eq!(h.clients[2].manager.locks().holder(&a), None);
    assert!(h.client(2).select(&a).is_ok());
}
