use bitflags::bitflags;
use serde::{Deserialize, Serialize};

macro_rules! draw_layers {
    ($(($variant:ident, $flag:ident, $display:literal)),* $(,)?) => {
        /// A named injection point in the host's per-frame draw sequence.
        ///
        /// Variants are declared in the order the host reaches them, so the
        /// derived [`Ord`] is the frame order.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum Layer {
            $(
                #[doc = $display]
                $variant,
            )*
        }

        impl Layer {
            /// Every layer, in frame order.
            pub fn all() -> &'static [Layer] {
                &[$(Self::$variant,)*]
            }

            pub fn display_name(&self) -> &'static str {
                match self {
                    $(Self::$variant => $display,)*
                }
            }
        }

        bitflags! {
            /// A set of [`Layer`]s, used to subscribe observers to part of the frame.
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
            #[serde(transparent)]
            pub struct LayerSet: u16 {
                $(
                    #[doc = $display]
                    const $flag = 1 << (Layer::$variant as u16);
                )*
            }
        }
    };
}

draw_layers!(
    (BeforeBackground, BEFORE_BACKGROUND, "Before background"),
    (BeforeWalls, BEFORE_WALLS, "Before walls"),
    (BeforeNonSolidTiles, BEFORE_NON_SOLID_TILES, "Before non-solid tiles"),
    (BeforeNPCsBehindTiles, BEFORE_NPCS_BEHIND_TILES, "Before NPCs behind tiles"),
    (BeforeSolidTiles, BEFORE_SOLID_TILES, "Before solid tiles"),
    (BeforePlayersBehindNPCs, BEFORE_PLAYERS_BEHIND_NPCS, "Before players behind NPCs"),
    (BeforeNPCs, BEFORE_NPCS, "Before NPCs"),
    (BeforeProjectiles, BEFORE_PROJECTILES, "Before projectiles"),
    (BeforePlayers, BEFORE_PLAYERS, "Before players"),
    (BeforeItems, BEFORE_ITEMS, "Before items"),
    (BeforeRain, BEFORE_RAIN, "Before rain"),
    (BeforeGore, BEFORE_GORE, "Before gore"),
    (BeforeDust, BEFORE_DUST, "Before dust"),
    (BeforeInterface, BEFORE_INTERFACE, "Before interface"),
    (AfterInterface, AFTER_INTERFACE, "After interface"),
);

impl Layer {
    /// Number of layers in a frame.
    pub const COUNT: usize = 15;

    /// Position of this layer in the frame, starting at 0.
    pub fn index(self) -> usize {
        self as usize
    }

    /// The layer the host reaches after this one, if any.
    pub fn next(self) -> Option<Layer> {
        Self::all().get(self.index() + 1).copied()
    }
}

impl Default for Layer {
    fn default() -> Self {
        Self::BeforeProjectiles
    }
}

impl From<Layer> for LayerSet {
    fn from(layer: Layer) -> Self {
        LayerSet::from_bits_retain(1 << (layer as u16))
    }
}

impl LayerSet {
    pub fn contains_layer(&self, layer: Layer) -> bool {
        self.contains(LayerSet::from(layer))
    }

    /// Iterates the layers in this set, in frame order.
    pub fn layers(&self) -> impl Iterator<Item = Layer> + '_ {
        Layer::all()
            .iter()
            .copied()
            .filter(|layer| self.contains_layer(*layer))
    }
}

impl Default for LayerSet {
    fn default() -> Self {
        Self::all()
    }
}
