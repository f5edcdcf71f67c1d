#[cfg(windows)]
mod platform {
    use crate::domain::keypad::{Keystroke, KeystrokeInjector};
    use tracing::{debug, trace};
    use windows::Win32::UI::Input::KeyboardAndMouse::{
        SendInput, INPUT, INPUT_0, INPUT_KEYBOARD, KEYBDINPUT, KEYBD_EVENT_FLAGS, KEYEVENTF_KEYUP,
        KEYEVENTF_UNICODE, VIRTUAL_KEY, VK_RETURN,
    };

    /// Injects keystrokes through `SendInput`
    pub struct InputSimulator;

    impl InputSimulator {
        pub fn new() -> Self {
            Self
        }
    }

    /// Digits go in as Unicode characters so the active keyboard layout does
    /// not matter; Enter goes in as a virtual key.
    fn key_event(key: Keystroke, release: bool) -> INPUT {
        let up = if release {
            KEYEVENTF_KEYUP
        } else {
            KEYBD_EVENT_FLAGS(0)
        };
        let (vk, scan, flags) = match key {
            Keystroke::Digit(d) => (VIRTUAL_KEY(0), u16::from(b'0' + d), KEYEVENTF_UNICODE | up),
            Keystroke::Enter => (VK_RETURN, 0, up),
        };

        INPUT {
            r#type: INPUT_KEYBOARD,
            Anonymous: INPUT_0 {
                ki: KEYBDINPUT {
                    wVk: vk,
                    wScan: scan,
                    dwFlags: flags,
                    time: 0,
                    dwExtraInfo: 0,
                },
            },
        }
    }

    impl KeystrokeInjector for InputSimulator {
        fn inject(&self, keys: &[Keystroke]) -> anyhow::Result<()> {
            let inputs: Vec<INPUT> = keys
                .iter()
                .flat_map(|&key| [key_event(key, false), key_event(key, true)])
                .collect();

            trace!("Keystrokes: {:?}", keys);
            // One batch, so nothing else can interleave with the entry.
            let sent = unsafe { SendInput(&inputs, std::mem::size_of::<INPUT>() as i32) };
            if sent as usize != inputs.len() {
                anyhow::bail!(
                    "SendInput inserted {} of {} keyboard events",
                    sent,
                    inputs.len()
                );
            }

            debug!("Injected {} keystrokes", keys.len());
            Ok(())
        }
    }
}

#[cfg(not(windows))]
mod platform {
    use crate::domain::keypad::{Keystroke, KeystrokeInjector};

    /// Stand-in on hosts without a supported input injection backend
    pub struct InputSimulator;

    impl InputSimulator {
        pub fn new() -> Self {
            Self
        }
    }

    impl KeystrokeInjector for InputSimulator {
        fn inject(&self, keys: &[Keystroke]) -> anyhow::Result<()> {
            anyhow::bail!(
                "keystroke injection is not supported on this platform ({} keys dropped)",
                keys.len()
            )
        }
    }
}

pub use platform::InputSimulator;
