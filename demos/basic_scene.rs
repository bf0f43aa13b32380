use scenedoc::scene::nodes::{VolumeDisplayNode, VolumeNode};
use scenedoc::{Scene, SceneEvent, SceneNode};

fn main() {
    env_logger::init();

    let mut scene = Scene::new();
    scene.set_undo_enabled(true);

    scene.observe(|event| {
        if let SceneEvent::NodeAdded(node) = event {
            println!("added {}", node.borrow().core().id());
        }
    });

    // Create a volume with a display node wired by ID
    let display = scene.add_node(VolumeDisplayNode::new_handle());
    let display_id = display.borrow().core().id().to_string();

    let volume = scene.add_node(VolumeNode::new_handle());
    {
        let mut n = volume.borrow_mut();
        let v = n.as_any_mut().downcast_mut::<VolumeNode>().unwrap();
        v.set_display_node_id(Some(display_id));
        v.set_spacing([0.5, 0.5, 2.0]);
    }

    println!("scene has {} nodes", scene.number_of_nodes());

    // Mutate under undo protection, then step back
    scene.save_state_for_undo(&[volume.clone()]);
    volume.borrow_mut().core_mut().set_name("relabeled");
    scene.undo();
    println!("volume is named {:?}", volume.borrow().core().name());

    // Round-trip the whole scene through the document format
    let text = scene.commit_to_string();
    println!("---\n{}", text);
    scene.connect_from_string(&text).expect("round trip");
    println!("reloaded {} nodes", scene.number_of_nodes());
}
