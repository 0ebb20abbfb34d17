use std::collections::HashMap;

use glam::Vec3;

use crate::tween::Easing;

/// The hero section behind the 3D view: a set of active classes and the
/// background colour they select.
pub struct Backdrop {
    base_color: Vec3,
    class_colors: HashMap<String, Vec3>,
    // In activation order, last one wins
    active: Vec<String>,
    transition: f32,

    from: Vec3,
    color: Vec3,
    elapsed: f32,
}

impl Backdrop {
    pub fn new(base_color: Vec3, class_colors: HashMap<String, Vec3>, transition: f32) -> Self {
        Self {
            base_color,
            class_colors,
            active: Vec::new(),
            transition: transition.max(0.0),
            from: base_color,
            color: base_color,
            elapsed: 0.0,
        }
    }

    /// Returns false if the class was already active.
    pub fn add_class(&mut self, class: &str) -> bool {
        if self.has_class(class) {
            return false;
        }

        self.active.push(class.to_string());
        log::info!("hero: +{class} -> [{}]", self.active.join(" "));
        self.retarget();
        true
    }

    /// Returns false if the class was not active.
    pub fn remove_class(&mut self, class: &str) -> bool {
        let before = self.active.len();
        self.active.retain(|active| active != class);
        if self.active.len() == before {
            return false;
        }

        log::info!("hero: -{class} -> [{}]", self.active.join(" "));
        self.retarget();
        true
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.active.iter().any(|active| active == class)
    }

    pub fn classes(&self) -> &[String] {
        &self.active
    }

    pub fn target_color(&self) -> Vec3 {
        self.active
            .iter()
            .rev()
            .find_map(|class| self.class_colors.get(class))
            .copied()
            .unwrap_or(self.base_color)
    }

    pub fn color(&self) -> Vec3 {
        self.color
    }

    pub fn update(&mut self, dt: f32) {
        self.elapsed += dt.max(0.0);
        let t = if self.transition <= 0.0 {
            1.0
        } else {
            self.elapsed / self.transition
        };

        self.color = self
            .from
            .lerp(self.target_color(), Easing::Power2InOut.apply(t));
    }

    fn retarget(&mut self) {
        self.from = self.color;
        self.elapsed = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backdrop() -> Backdrop {
        let classes = HashMap::from([
            ("home-hover".to_string(), Vec3::new(0.1, 0.2, 0.3)),
            ("pacman-hover".to_string(), Vec3::new(0.3, 0.2, 0.1)),
        ]);
        Backdrop::new(Vec3::ZERO, classes, 0.5)
    }

    #[test]
    fn adding_and_removing_is_idempotent() {
        let mut backdrop = backdrop();

        assert!(backdrop.add_class("home-hover"));
        assert!(!backdrop.add_class("home-hover"));
        assert_eq!(backdrop.classes(), ["home-hover".to_string()]);

        assert!(backdrop.remove_class("home-hover"));
        assert!(!backdrop.remove_class("home-hover"));
        assert!(backdrop.classes().is_empty());
    }

    #[test]
    fn latest_class_selects_the_colour() {
        let mut backdrop = backdrop();
        backdrop.add_class("home-hover");
        backdrop.add_class("pacman-hover");
        assert_eq!(backdrop.target_color(), Vec3::new(0.3, 0.2, 0.1));

        backdrop.remove_class("pacman-hover");
        assert_eq!(backdrop.target_color(), Vec3::new(0.1, 0.2, 0.3));

        backdrop.add_class("unstyled");
        assert_eq!(backdrop.target_color(), Vec3::new(0.1, 0.2, 0.3));
    }

    #[test]
    fn colour_eases_to_target() {
        let mut backdrop = backdrop();
        backdrop.add_class("pacman-hover");

        backdrop.update(0.25);
        let midway = backdrop.color();
        assert!(midway.x > 0.0 && midway.x < 0.3);

        backdrop.update(0.25);
        assert!((backdrop.color() - Vec3::new(0.3, 0.2, 0.1)).length() < 1e-6);

        backdrop.remove_class("pacman-hover");
        backdrop.update(1.0);
        assert!(backdrop.color().length() < 1e-6);
    }
}
