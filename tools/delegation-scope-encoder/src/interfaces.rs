//! Solidity ABI shapes consumed by the enforcers.

use alloy_sol_types::sol;

sol! {
    /// One entry of a caveat group as the logical-OR wrapper decodes it.
    struct AbiCaveat {
        address enforcer;
        bytes terms;
        bytes args;
    }

    struct AbiCaveatGroup {
        AbiCaveat[] caveats;
    }

    /// Execution-time selection passed as the wrapper caveat's `args`.
    struct AbiSelectedGroup {
        uint256 groupIndex;
        bytes[] caveatArgs;
    }

    interface IERC20 {
        function approve(address spender, uint256 amount) external returns (bool);
    }
}
