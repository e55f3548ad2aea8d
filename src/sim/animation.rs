//! Two-frame weapon animations

use serde::Serialize;

use super::tool::Tool;
use crate::config::ToolTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Frame {
    One,
    Two,
}

impl Frame {
    fn flipped(self) -> Frame {
        match self {
            Frame::One => Frame::Two,
            Frame::Two => Frame::One,
        }
    }

    pub fn number(self) -> u8 {
        match self {
            Frame::One => 1,
            Frame::Two => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WeaponAnimation {
    pub tool: Tool,
    pub active: bool,
    pub frame: Frame,
    pub last_frame_ms: f64,
    pub frame_interval_ms: f64,
}

impl WeaponAnimation {
    fn new(tool: Tool, frame_interval_ms: f64) -> Self {
        Self {
            tool,
            active: false,
            frame: Frame::One,
            last_frame_ms: 0.0,
            frame_interval_ms,
        }
    }
}

pub type FrameObserver = Box<dyn FnMut(Tool, Frame)>;

/// One animation per tool, alive for the engine's lifetime
pub struct WeaponAnimations {
    states: [WeaponAnimation; 6],
    now_ms: f64,
    on_frame: Option<FrameObserver>,
}

impl WeaponAnimations {
    pub fn new(tools: &ToolTable) -> Self {
        Self {
            states: Tool::ALL
                .map(|tool| WeaponAnimation::new(tool, tools.get(tool).frame_interval_ms)),
            now_ms: 0.0,
            on_frame: None,
        }
    }

    fn slot(tool: Tool) -> usize {
        match tool {
            Tool::Hammer => 0,
            Tool::Gun => 1,
            Tool::Flamethrower => 2,
            Tool::Laser => 3,
            Tool::Paintball => 4,
            Tool::Chainsaw => 5,
        }
    }

    pub fn start_animation(&mut self, tool: Tool) {
        let now = self.now_ms;
        let state = &mut self.states[Self::slot(tool)];
        if !state.active {
            state.active = true;
            state.last_frame_ms = now;
        }
    }

    /// Deactivate and snap back to frame one
    pub fn stop_animation(&mut self, tool: Tool) {
        let state = &mut self.states[Self::slot(tool)];
        let changed = state.frame != Frame::One;
        state.active = false;
        state.frame = Frame::One;
        if changed {
            if let Some(observer) = self.on_frame.as_mut() {
                observer(tool, Frame::One);
            }
        }
    }

    pub fn stop_all(&mut self) {
        for tool in Tool::ALL {
            self.stop_animation(tool);
        }
    }

    pub fn current_frame(&self, tool: Tool) -> Frame {
        self.states[Self::slot(tool)].frame
    }

    pub fn is_animating(&self, tool: Tool) -> bool {
        self.states[Self::slot(tool)].active
    }

    pub fn state(&self, tool: Tool) -> &WeaponAnimation {
        &self.states[Self::slot(tool)]
    }

    /// Called with every frame change
    pub fn set_frame_observer(&mut self, observer: Option<FrameObserver>) {
        self.on_frame = observer;
    }

    pub fn update(&mut self, _delta_ms: f64, total_ms: f64) {
        self.now_ms = total_ms;
        for state in self.states.iter_mut().filter(|s| s.active) {
            if total_ms - state.last_frame_ms >= state.frame_interval_ms {
                state.frame = state.frame.flipped();
                state.last_frame_ms = total_ms;
                if let Some(observer) = self.on_frame.as_mut() {
                    observer(state.tool, state.frame);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn anims() -> WeaponAnimations {
        WeaponAnimations::new(&ToolTable::default())
    }

    #[test]
    fn test_idle_until_started() {
        let mut a = anims();
        a.update(16.0, 1000.0);
        assert!(!a.is_animating(Tool::Gun));
        assert_eq!(a.current_frame(Tool::Gun), Frame::One);
    }

    #[test]
    fn test_flips_at_tool_interval() {
        let mut a = anims();
        a.update(16.0, 0.0);
        a.start_animation(Tool::Gun);
        a.start_animation(Tool::Flamethrower);

        // gun 100 ms, flamethrower 200 ms
        a.update(50.0, 50.0);
        assert_eq!(a.current_frame(Tool::Gun), Frame::One);
        a.update(50.0, 100.0);
        assert_eq!(a.current_frame(Tool::Gun), Frame::Two);
        assert_eq!(a.current_frame(Tool::Flamethrower), Frame::One);
        a.update(100.0, 200.0);
        assert_eq!(a.current_frame(Tool::Gun), Frame::One);
        assert_eq!(a.current_frame(Tool::Flamethrower), Frame::Two);
    }

    #[test]
    fn test_stop_resets_to_first_frame() {
        let mut a = anims();
        a.start_animation(Tool::Hammer);
        a.update(150.0, 150.0);
        assert_eq!(a.current_frame(Tool::Hammer), Frame::Two);
        a.stop_animation(Tool::Hammer);
        assert!(!a.is_animating(Tool::Hammer));
        assert_eq!(a.current_frame(Tool::Hammer), Frame::One);
        a.update(500.0, 650.0);
        assert_eq!(a.current_frame(Tool::Hammer), Frame::One);
    }

    #[test]
    fn test_observer_sees_each_flip() {
        let mut a = anims();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        a.set_frame_observer(Some(Box::new(move |tool: Tool, frame: Frame| {
            sink.borrow_mut().push((tool, frame.number()))
        })));
        a.start_animation(Tool::Laser);
        a.update(120.0, 120.0);
        a.update(120.0, 240.0);
        a.update(120.0, 360.0);
        a.stop_animation(Tool::Laser);
        assert_eq!(
            *seen.borrow(),
            [(Tool::Laser, 2), (Tool::Laser, 1), (Tool::Laser, 2), (Tool::Laser, 1)]
        );
    }
}
