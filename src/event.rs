//! Input and window events delivered to each window's queue.

use crate::platform::WindowId;
use std::fmt;

/// Native event tags. The values match SDL's so a binding can pass them
/// through untouched.
pub mod kind {
    pub const QUIT: u32 = 0x100;
    pub const WINDOW: u32 = 0x200;
    pub const KEY_DOWN: u32 = 0x300;
    pub const KEY_UP: u32 = 0x301;
    pub const MOUSE_MOTION: u32 = 0x400;
    pub const MOUSE_BUTTON_DOWN: u32 = 0x401;
    pub const MOUSE_BUTTON_UP: u32 = 0x402;
    pub const MOUSE_WHEEL: u32 = 0x403;
}

/// An undecoded native event. For window events `code` holds the
/// [`WindowEventKind`] and `x`, `y` its two data words; for keys it holds the
/// keycode and for mouse buttons the button index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawEvent {
    pub kind: u32,
    pub window: u32,
    pub pressed: bool,
    pub repeat: bool,
    pub code: i32,
    pub x: i32,
    pub y: i32,
    pub xrel: i32,
    pub yrel: i32,
}

impl RawEvent {
    pub fn new(kind: u32, window: WindowId) -> Self {
        Self {
            kind,
            window: window.0,
            ..Self::default()
        }
    }

    pub fn window(window: WindowId, event: WindowEventKind, data1: i32, data2: i32) -> Self {
        Self {
            code: u8::from(event) as i32,
            x: data1,
            y: data2,
            ..Self::new(kind::WINDOW, window)
        }
    }

    pub fn key(window: WindowId, key: Key, pressed: bool, repeat: bool) -> Self {
        let tag = if pressed { kind::KEY_DOWN } else { kind::KEY_UP };
        Self {
            pressed,
            repeat,
            code: key.0,
            ..Self::new(tag, window)
        }
    }

    pub fn mouse_motion(window: WindowId, x: i32, y: i32, xrel: i32, yrel: i32) -> Self {
        Self {
            x,
            y,
            xrel,
            yrel,
            ..Self::new(kind::MOUSE_MOTION, window)
        }
    }

    pub fn mouse_button(window: WindowId, button: Button, pressed: bool, x: i32, y: i32) -> Self {
        let tag = if pressed {
            kind::MOUSE_BUTTON_DOWN
        } else {
            kind::MOUSE_BUTTON_UP
        };
        Self {
            pressed,
            code: u8::from(button) as i32,
            x,
            y,
            ..Self::new(tag, window)
        }
    }

    pub fn mouse_wheel(window: WindowId, x: i32, y: i32) -> Self {
        Self {
            x,
            y,
            ..Self::new(kind::MOUSE_WHEEL, window)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Window(WindowEvent),
    Keyboard(KeyboardEvent),
    MouseMotion(MouseMotionEvent),
    MouseButton(MouseButtonEvent),
    MouseWheel(MouseWheelEvent),
}

impl Event {
    /// Decodes a native event. Kinds without a typed counterpart give `None`.
    pub fn from_raw(raw: &RawEvent) -> Option<Self> {
        let window = WindowId(raw.window);
        Some(match raw.kind {
            kind::WINDOW => Event::Window(WindowEvent {
                window,
                kind: WindowEventKind::from(raw.code as u8),
                data1: raw.x,
                data2: raw.y,
            }),
            kind::KEY_DOWN | kind::KEY_UP => Event::Keyboard(KeyboardEvent {
                window,
                down: raw.pressed,
                repeat: raw.repeat,
                key: Key(raw.code),
            }),
            kind::MOUSE_MOTION => Event::MouseMotion(MouseMotionEvent {
                window,
                x: raw.x,
                y: raw.y,
                xrel: raw.xrel,
                yrel: raw.yrel,
            }),
            kind::MOUSE_BUTTON_DOWN | kind::MOUSE_BUTTON_UP => {
                Event::MouseButton(MouseButtonEvent {
                    window,
                    button: Button::from(raw.code as u8),
                    down: raw.pressed,
                    x: raw.x,
                    y: raw.y,
                })
            }
            kind::MOUSE_WHEEL => Event::MouseWheel(MouseWheelEvent {
                window,
                x: raw.x,
                y: raw.y,
            }),
            _ => return None,
        })
    }

    pub fn window_id(&self) -> WindowId {
        match self {
            Event::Window(e) => e.window,
            Event::Keyboard(e) => e.window,
            Event::MouseMotion(e) => e.window,
            Event::MouseButton(e) => e.window,
            Event::MouseWheel(e) => e.window,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowEvent {
    pub window: WindowId,
    pub kind: WindowEventKind,
    pub data1: i32,
    pub data2: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyboardEvent {
    pub window: WindowId,
    pub down: bool,
    pub repeat: bool,
    pub key: Key,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseMotionEvent {
    pub window: WindowId,
    pub x: i32,
    pub y: i32,
    pub xrel: i32,
    pub yrel: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseButtonEvent {
    pub window: WindowId,
    pub button: Button,
    pub down: bool,
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseWheelEvent {
    pub window: WindowId,
    pub x: i32,
    pub y: i32,
}

macro_rules! coded_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident = $code:literal => $label:literal,)* }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant,)*
            Unknown(u8),
        }

        impl From<u8> for $name {
            fn from(code: u8) -> Self {
                match code {
                    $($code => Self::$variant,)*
                    other => Self::Unknown(other),
                }
            }
        }

        impl From<$name> for u8 {
            fn from(value: $name) -> u8 {
                match value {
                    $($name::$variant => $code,)*
                    $name::Unknown(code) => code,
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self {
                    $(Self::$variant => f.write_str($label),)*
                    Self::Unknown(code) => write!(f, "Unknown({code})"),
                }
            }
        }
    };
}

coded_enum!(
    /// What happened to a window.
    WindowEventKind {
        Shown = 1 => "WindowShown",
        Hidden = 2 => "WindowHidden",
        Exposed = 3 => "WindowExposed",
        Moved = 4 => "WindowMoved",
        Resized = 5 => "WindowResized",
        SizeChanged = 6 => "WindowSizeChanged",
        Minimized = 7 => "WindowMinimized",
        Maximized = 8 => "WindowMaximized",
        Restored = 9 => "WindowRestored",
        Enter = 10 => "WindowEnter",
        Leave = 11 => "WindowLeave",
        FocusGained = 12 => "WindowFocusGained",
        FocusLost = 13 => "WindowFocusLost",
        Close = 14 => "WindowClose",
    }
);

coded_enum!(
    Button {
        Left = 1 => "ButtonLeft",
        Middle = 2 => "ButtonMiddle",
        Right = 3 => "ButtonRight",
        X1 = 4 => "ButtonX1",
        X2 = 5 => "ButtonX2",
    }
);

/// A virtual keycode. Printable keys use their lowercase ASCII value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Key(pub i32);

const SCANCODE_MASK: i32 = 1 << 30;

macro_rules! named_keys {
    ($($name:ident = $code:expr => $label:literal,)*) => {
        impl Key {
            $(pub const $name: Key = Key($code);)*
        }

        const NAMED_KEYS: &[(Key, &str)] = &[$((Key::$name, $label),)*];
    };
}

named_keys! {
    UNKNOWN = 0 => "KeyUnknown",
    BACKSPACE = 8 => "KeyBackspace",
    TAB = 9 => "KeyTab",
    RETURN = 13 => "KeyReturn",
    ESCAPE = 27 => "KeyEscape",
    SPACE = 32 => "KeySpace",
    DELETE = 127 => "KeyDelete",
    CAPS_LOCK = SCANCODE_MASK | 57 => "KeyCapsLock",
    INSERT = SCANCODE_MASK | 73 => "KeyInsert",
    HOME = SCANCODE_MASK | 74 => "KeyHome",
    PAGE_UP = SCANCODE_MASK | 75 => "KeyPageUp",
    END = SCANCODE_MASK | 77 => "KeyEnd",
    PAGE_DOWN = SCANCODE_MASK | 78 => "KeyPageDown",
    RIGHT = SCANCODE_MASK | 79 => "KeyRight",
    LEFT = SCANCODE_MASK | 80 => "KeyLeft",
    DOWN = SCANCODE_MASK | 81 => "KeyDown",
    UP = SCANCODE_MASK | 82 => "KeyUp",
    LCTRL = SCANCODE_MASK | 224 => "KeyLCtrl",
    LSHIFT = SCANCODE_MASK | 225 => "KeyLShift",
    LALT = SCANCODE_MASK | 226 => "KeyLAlt",
    RCTRL = SCANCODE_MASK | 228 => "KeyRCtrl",
    RSHIFT = SCANCODE_MASK | 229 => "KeyRShift",
    RALT = SCANCODE_MASK | 230 => "KeyRAlt",
}

impl Key {
    /// The function key `F<n>` for `n` in `1..=12`.
    pub const fn f(n: u8) -> Key {
        Key(SCANCODE_MASK | (57 + n as i32))
    }

    pub fn from_char(c: char) -> Key {
        Key(c.to_ascii_lowercase() as i32)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some((_, label)) = NAMED_KEYS.iter().find(|(key, _)| key == self) {
            return f.write_str(label);
        }
        match self.0 {
            c @ 0x61..=0x7A => write!(f, "Key{}", (c as u8 as char).to_ascii_uppercase()),
            c @ 0x30..=0x39 => write!(f, "Key{}", c as u8 as char),
            c if (Key::f(1).0..=Key::f(12).0).contains(&c) => write!(f, "KeyF{}", c - Key::f(1).0 + 1),
            c => write!(f, "Unknown({c})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_every_supported_kind() {
        let id = WindowId(3);
        let raws = [
            RawEvent::window(id, WindowEventKind::Resized, 640, 480),
            RawEvent::key(id, Key::ESCAPE, true, false),
            RawEvent::mouse_motion(id, 1, 2, 3, 4),
            RawEvent::mouse_button(id, Button::Right, false, 5, 6),
            RawEvent::mouse_wheel(id, 0, -1),
        ];
        for raw in &raws {
            let event = Event::from_raw(raw).unwrap();
            assert_eq!(event.window_id(), id);
        }
        assert_eq!(
            Event::from_raw(&raws[0]),
            Some(Event::Window(WindowEvent {
                window: id,
                kind: WindowEventKind::Resized,
                data1: 640,
                data2: 480,
            }))
        );
        assert_eq!(
            Event::from_raw(&raws[3]),
            Some(Event::MouseButton(MouseButtonEvent {
                window: id,
                button: Button::Right,
                down: false,
                x: 5,
                y: 6,
            }))
        );
    }

    #[test]
    fn unsupported_kinds_are_discarded() {
        assert_eq!(Event::from_raw(&RawEvent::new(kind::QUIT, WindowId(1))), None);
        assert_eq!(Event::from_raw(&RawEvent::new(0xFFFF, WindowId(1))), None);
    }

    #[test]
    fn names() {
        assert_eq!(WindowEventKind::FocusLost.to_string(), "WindowFocusLost");
        assert_eq!(WindowEventKind::from(99).to_string(), "Unknown(99)");
        assert_eq!(Button::X2.to_string(), "ButtonX2");
        assert_eq!(Button::from(0).to_string(), "Unknown(0)");
        assert_eq!(Key::from_char('Q').to_string(), "KeyQ");
        assert_eq!(Key::from_char('7').to_string(), "Key7");
        assert_eq!(Key::RETURN.to_string(), "KeyReturn");
        assert_eq!(Key::f(10).to_string(), "KeyF10");
        assert_eq!(Key(-5).to_string(), "Unknown(-5)");
    }
}
