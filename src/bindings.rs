// Key bindings: which keystroke means which velocity command

use crate::state::{ScaleFactors, VelocityIntent};

/// ASCII ETX, what Ctrl-C produces in raw mode
pub const CTRL_C: char = '\x03';

pub const HELP_MSG: &str = "
Reading from the keyboard and publishing to cmd_vel.
Works best with a US keyboard layout.
---------------------------
Moving around:
   u    i    o
   j    k    l
   m    ,    .

Holonomic mode (strafing), hold down shift:
---------------------------
   U    I    O
   J    K    L
   M    <    >

t : up (+z)
b : down (-z)

anything else : stop

q/z : increase/decrease max speeds by 10%
w/x : increase/decrease only linear speed by 10%
e/c : increase/decrease only angular speed by 10%

CTRL-C to quit
";

/// Movement keys -> (x, y, z, th). Lowercase turns, uppercase strafes.
pub const MOVE_BINDINGS: [(char, VelocityIntent); 18] = [
    ('i', VelocityIntent::new(1, 0, 0, 0)),
    ('o', VelocityIntent::new(1, 0, 0, -1)),
    ('j', VelocityIntent::new(0, 0, 0, 1)),
    ('l', VelocityIntent::new(0, 0, 0, -1)),
    ('u', VelocityIntent::new(1, 0, 0, 1)),
    (',', VelocityIntent::new(-1, 0, 0, 0)),
    ('.', VelocityIntent::new(-1, 0, 0, 1)),
    ('m', VelocityIntent::new(-1, 0, 0, -1)),
    ('O', VelocityIntent::new(1, -1, 0, 0)),
    ('I', VelocityIntent::new(1, 0, 0, 0)),
    ('J', VelocityIntent::new(0, 1, 0, 0)),
    ('L', VelocityIntent::new(0, -1, 0, 0)),
    ('U', VelocityIntent::new(1, 1, 0, 0)),
    ('<', VelocityIntent::new(-1, 0, 0, 0)),
    ('>', VelocityIntent::new(-1, -1, 0, 0)),
    ('M', VelocityIntent::new(-1, 1, 0, 0)),
    ('t', VelocityIntent::new(0, 0, 1, 0)),
    ('b', VelocityIntent::new(0, 0, -1, 0)),
];

/// Speed keys -> (linear factor, angular factor)
pub const SPEED_BINDINGS: [(char, ScaleFactors); 6] = [
    ('q', ScaleFactors::new(1.1, 1.1)),
    ('z', ScaleFactors::new(0.9, 0.9)),
    ('w', ScaleFactors::new(1.1, 1.0)),
    ('x', ScaleFactors::new(0.9, 1.0)),
    ('e', ScaleFactors::new(1.0, 1.1)),
    ('c', ScaleFactors::new(1.0, 0.9)),
];

/// What a single keystroke asks for
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KeyCommand {
    Move(VelocityIntent),
    Scale(ScaleFactors),
    /// Unrecognized key: halt
    Stop,
    /// Ctrl-C: halt and end the session
    Quit,
}

pub fn decode(key: char) -> KeyCommand {
    if let Some((_, intent)) = MOVE_BINDINGS.iter().find(|(k, _)| *k == key) {
        return KeyCommand::Move(*intent);
    }
    if let Some((_, factors)) = SPEED_BINDINGS.iter().find(|(k, _)| *k == key) {
        return KeyCommand::Scale(*factors);
    }
    if key == CTRL_C {
        KeyCommand::Quit
    } else {
        KeyCommand::Stop
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_every_move_key_decodes_to_its_tuple() {
        for (key, intent) in MOVE_BINDINGS {
            assert_eq!(decode(key), KeyCommand::Move(intent), "key {:?}", key);
        }
    }

    #[test]
    fn test_binding_table_shape() {
        let keys: HashSet<char> = MOVE_BINDINGS.iter().map(|(k, _)| *k).collect();
        let tuples: HashSet<VelocityIntent> = MOVE_BINDINGS.iter().map(|(_, t)| *t).collect();
        assert_eq!(keys.len(), 18);
        assert_eq!(tuples.len(), 16);
        assert!(!tuples.contains(&VelocityIntent::STOP));

        let speed_keys: HashSet<char> = SPEED_BINDINGS.iter().map(|(k, _)| *k).collect();
        assert_eq!(speed_keys.len(), 6);
        assert!(speed_keys.is_disjoint(&keys));
    }

    #[test]
    fn test_aliased_move_keys() {
        // Only these two pairs share a direction
        assert_eq!(decode('i'), decode('I'));
        assert_eq!(decode(','), decode('<'));
        assert_ne!(decode('u'), decode('U'));
        assert_ne!(decode('.'), decode('>'));
    }

    #[test]
    fn test_bindings_are_case_sensitive() {
        assert_eq!(decode('o'), KeyCommand::Move(VelocityIntent::new(1, 0, 0, -1)));
        assert_eq!(decode('O'), KeyCommand::Move(VelocityIntent::new(1, -1, 0, 0)));
        // No uppercase speed keys
        assert_eq!(decode('Q'), KeyCommand::Stop);
        assert_eq!(decode('T'), KeyCommand::Stop);
    }

    #[test]
    fn test_other_printable_keys_stop() {
        let bound: HashSet<char> = MOVE_BINDINGS
            .iter()
            .map(|(k, _)| *k)
            .chain(SPEED_BINDINGS.iter().map(|(k, _)| *k))
            .collect();
        for key in (' '..='~').filter(|c| !bound.contains(c)) {
            assert_eq!(decode(key), KeyCommand::Stop, "key {:?}", key);
        }
        assert_eq!(decode('k'), KeyCommand::Stop);
        assert_eq!(decode('\r'), KeyCommand::Stop);
    }

    #[test]
    fn test_ctrl_c_quits() {
        assert_eq!(decode(CTRL_C), KeyCommand::Quit);
    }

    #[test]
    fn test_speed_keys() {
        assert_eq!(decode('q'), KeyCommand::Scale(ScaleFactors::new(1.1, 1.1)));
        assert_eq!(decode('x'), KeyCommand::Scale(ScaleFactors::new(0.9, 1.0)));
        assert_eq!(decode('c'), KeyCommand::Scale(ScaleFactors::new(1.0, 0.9)));
    }
}
