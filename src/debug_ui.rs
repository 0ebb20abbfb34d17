use crate::{hero::HeroState, scene_graph::SlotState};

pub fn draw(hero: &HeroState, ui: &imgui::Ui) {
    ui.window("Hero").build(|| {
        ui.text(format!(
            "Viewport: {}x{} (aspect {:.3})",
            hero.viewport().0,
            hero.viewport().1,
            hero.camera.aspect()
        ));
        if hero.assets_settled() {
            ui.text("Assets: settled");
        } else {
            ui.text(format!("Assets: loading, {} slots pending", hero.registry.pending_count()));
        }
        ui.text(format!(
            "Hover: {}",
            if hero.hover.is_armed() { "armed" } else { "disarmed" }
        ));

        match hero.hover.pointer() {
            Some(pointer) => ui.text(format!("Pointer: ({:.3}, {:.3})", pointer.x, pointer.y)),
            None => ui.text("Pointer: outside"),
        }

        ui.separator();
        for region in hero.hover.regions() {
            ui.text(format!(
                "{} {}",
                if region.is_hovered() { "[x]" } else { "[ ]" },
                region.name
            ));
        }

        ui.separator();
        let color = hero.backdrop.color();
        ui.text(format!(
            "Backdrop: ({:.2}, {:.2}, {:.2}) classes: {}",
            color.x,
            color.y,
            color.z,
            hero.backdrop.classes().join(" ")
        ));
        ui.text(format!("Transforms updated: {}", hero.scene.changed_count()));

        if ui.collapsing_header(
            format!("Tweens ({})###tweens", hero.tweener.len()),
            imgui::TreeNodeFlags::empty(),
        ) {
            for (key, tween) in hero.tweener.iter() {
                let slot = hero.registry.slot_of(key.object).unwrap_or("?");
                ui.text(format!(
                    "{slot}.{:?}.{:?} -> {:.3} ({:.0}%)",
                    key.property,
                    key.axis,
                    tween.target(),
                    tween.progress() * 100.0
                ));
            }
        }

        if ui.collapsing_header("Slots", imgui::TreeNodeFlags::empty()) {
            for (slot, state) in hero.registry.iter() {
                let state = match state {
                    SlotState::Pending => "pending".to_string(),
                    SlotState::Bound(id) => format!("bound #{}", id.index()),
                    SlotState::Failed => "failed".to_string(),
                };
                ui.text(format!("{slot}: {state}"));
            }
        }
    });

    hero.materials.draw_ui(ui);
}
