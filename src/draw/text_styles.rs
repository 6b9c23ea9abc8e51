use embedded_graphics::mono_font::MonoFont;
use paste::paste;

pub type BuiltinFont = &'static MonoFont<'static>;

macro_rules! make_builtin_fonts {
    ([$($size:literal),+]) => {
        paste! {
            $(
                #[allow(dead_code)]
                pub const [<BUILTIN_ $size>]: BuiltinFont = &profont::[<PROFONT_ $size _POINT>];
            )+

            /// Point size and font, ascending
            pub const BUILTIN_FONTS: &[(u32, BuiltinFont)] = &[$(($size, [<BUILTIN_ $size>])),+];
        }
    };
}

make_builtin_fonts!([7, 9, 10, 12, 14, 18, 24]);

/// Point size of the built-in font closest to `px`, the smaller one on a tie
pub fn builtin_size(px: f32) -> u32 {
    BUILTIN_FONTS
        .iter()
        .map(|(size, _)| *size)
        .min_by(|a, b| (*a as f32 - px).abs().total_cmp(&(*b as f32 - px).abs()))
        .unwrap_or(9)
}

pub fn builtin_font(px: f32) -> BuiltinFont {
    let size = builtin_size(px);
    BUILTIN_FONTS
        .iter()
        .find(|(s, _)| *s == size)
        .map(|(_, font)| *font)
        .unwrap_or(BUILTIN_9)
}
