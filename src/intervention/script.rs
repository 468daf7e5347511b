use serde::Serialize;

use super::InterventionKind;

/// Display name and ordered instructions for one kind of session.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StepScript {
    pub name: &'static str,
    pub steps: &'static [&'static str],
}

const BREATHING: StepScript = StepScript {
    name: "Guided Breathing",
    steps: &[
        "Breathe in slowly for 4 seconds",
        "Hold your breath for 4 seconds",
        "Breathe out slowly for 4 seconds",
        "Hold for 4 seconds, then repeat",
    ],
};

const STRETCH: StepScript = StepScript {
    name: "Desk Stretch",
    steps: &[
        "Roll your shoulders back 5 times",
        "Gently tilt your head to each side",
        "Rotate your wrists in circles",
        "Take a deep breath and relax",
    ],
};

const POSTURE: StepScript = StepScript {
    name: "Posture Check",
    steps: &[
        "Sit up straight in your chair",
        "Roll shoulders back and down",
        "Place feet flat on the floor",
        "Ensure screen is at eye level",
    ],
};

const DND: StepScript = StepScript {
    name: "Do Not Disturb",
    steps: &[
        "Notifications are paused",
        "Close your eyes briefly",
        "Take a moment to reset",
        "Return when ready",
    ],
};

const MICROBREAK: StepScript = StepScript {
    name: "Micro-Break",
    steps: &[
        "Look at something 20 feet away",
        "Blink slowly several times",
        "Roll your shoulders gently",
        "Take a deep, calming breath",
    ],
};

const FALLBACK: StepScript = StepScript {
    name: "Micro-Recovery",
    steps: &["Take a moment to rest", "Breathe deeply", "Relax"],
};

/// Scripts are static, so the step count cannot change while a session runs.
pub fn resolve(kind: InterventionKind) -> StepScript {
    match kind {
        InterventionKind::Breathing => BREATHING,
        InterventionKind::Stretch => STRETCH,
        InterventionKind::Posture => POSTURE,
        InterventionKind::Dnd => DND,
        InterventionKind::Microbreak => MICROBREAK,
        InterventionKind::Other => FALLBACK,
    }
}

impl StepScript {
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_kinds_have_four_steps() {
        for kind in InterventionKind::SCRIPTED {
            let script = resolve(kind);
            assert_eq!(script.len(), 4, "{kind}");
            assert_ne!(script.name, "Micro-Recovery");
        }
    }

    #[test]
    fn unknown_kind_falls_back_to_generic_script() {
        let script = resolve(InterventionKind::parse("foo"));
        assert_eq!(script.name, "Micro-Recovery");
        assert_eq!(script.steps, &["Take a moment to rest", "Breathe deeply", "Relax"]);
    }

    #[test]
    fn resolution_is_stable() {
        assert_eq!(
            resolve(InterventionKind::Breathing),
            resolve(InterventionKind::Breathing)
        );
        assert_eq!(resolve(InterventionKind::Breathing).name, "Guided Breathing");
    }
}
